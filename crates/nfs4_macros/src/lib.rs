//! `#[derive(XdrCodec)]` for the NFSv4 protocol types.
//!
//! The derive implements `nfs4_types::xdr_codec::Pack` and
//! `nfs4_types::xdr_codec::Unpack` for:
//!
//! * structs (named, tuple or unit) — fields are encoded in declaration order;
//! * enums with only unit variants — encoded as their discriminant (`u32`);
//! * discriminated unions — every variant carries `#[xdr(value)]` and is either
//!   a unit variant (void arm) or a tuple variant with exactly one field.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Expr, Fields, Ident, Index, Lit, Meta, Variant,
    parse_macro_input,
};

/// Generated bodies of the three trait methods.
struct CodecBodies {
    packed_size: TokenStream2,
    pack: TokenStream2,
    unpack: TokenStream2,
}

/// Reads the `#[xdr(value)]` discriminant of a union arm.
fn xdr_discriminant(attrs: &[Attribute]) -> Option<u32> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("xdr"))
        .find_map(|attr| {
            let Meta::List(list) = &attr.meta else {
                return None;
            };
            match list.parse_args::<Expr>() {
                Ok(Expr::Lit(syn::ExprLit {
                    lit: Lit::Int(value),
                    ..
                })) => value.base10_parse::<u32>().ok(),
                _ => None,
            }
        })
}

fn field_var(i: usize) -> Ident {
    Ident::new(&format!("field_{i}"), Span::call_site())
}

fn struct_bodies(fields: &Fields) -> CodecBodies {
    match fields {
        Fields::Named(named) => {
            let names: Vec<_> = named.named.iter().map(|f| &f.ident).collect();
            CodecBodies {
                packed_size: quote! {
                    0 #(+ ::nfs4_types::xdr_codec::Pack::packed_size(&self.#names))*
                },
                pack: quote! {
                    let mut written = 0;
                    #(written += ::nfs4_types::xdr_codec::Pack::pack(&self.#names, out)?;)*
                    Ok(written)
                },
                unpack: quote! {
                    let mut read = 0;
                    #(
                        let (#names, n) = ::nfs4_types::xdr_codec::Unpack::unpack(input)?;
                        read += n;
                    )*
                    Ok((Self { #(#names),* }, read))
                },
            }
        }
        Fields::Unnamed(unnamed) => {
            let indexes: Vec<_> = (0..unnamed.unnamed.len()).map(Index::from).collect();
            let vars: Vec<_> = (0..unnamed.unnamed.len()).map(field_var).collect();
            CodecBodies {
                packed_size: quote! {
                    0 #(+ ::nfs4_types::xdr_codec::Pack::packed_size(&self.#indexes))*
                },
                pack: quote! {
                    let mut written = 0;
                    #(written += ::nfs4_types::xdr_codec::Pack::pack(&self.#indexes, out)?;)*
                    Ok(written)
                },
                unpack: quote! {
                    let mut read = 0;
                    #(
                        let (#vars, n) = ::nfs4_types::xdr_codec::Unpack::unpack(input)?;
                        read += n;
                    )*
                    Ok((Self(#(#vars),*), read))
                },
            }
        }
        Fields::Unit => CodecBodies {
            packed_size: quote! { 0 },
            pack: quote! {
                let _ = out;
                Ok(0)
            },
            unpack: quote! {
                let _ = input;
                Ok((Self, 0))
            },
        },
    }
}

fn simple_enum_bodies(data: &DataEnum) -> CodecBodies {
    let idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    CodecBodies {
        packed_size: quote! { 4 },
        pack: quote! {
            let value: u32 = match self {
                #(Self::#idents => Self::#idents as u32,)*
            };
            ::nfs4_types::xdr_codec::Pack::pack(&value, out)
        },
        unpack: quote! {
            let (value, read): (u32, usize) = ::nfs4_types::xdr_codec::Unpack::unpack(input)?;
            match value {
                #(v if v == Self::#idents as u32 => Ok((Self::#idents, read)),)*
                other => Err(::nfs4_types::xdr_codec::Error::InvalidEnumValue(other)),
            }
        },
    }
}

/// A union arm is either void or carries exactly one value.
fn union_arm(variant: &Variant) -> Result<(u32, bool), syn::Error> {
    let Some(discriminant) = xdr_discriminant(&variant.attrs) else {
        return Err(syn::Error::new_spanned(
            variant,
            "union variant must have a #[xdr(value)] attribute",
        ));
    };
    match &variant.fields {
        Fields::Unit => Ok((discriminant, false)),
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => Ok((discriminant, true)),
        _ => Err(syn::Error::new_spanned(
            variant,
            "union variant must be a unit variant or have exactly one unnamed field",
        )),
    }
}

fn union_bodies(data: &DataEnum) -> Result<CodecBodies, syn::Error> {
    let mut sizes = Vec::new();
    let mut packs = Vec::new();
    let mut unpacks = Vec::new();

    for variant in &data.variants {
        let ident = &variant.ident;
        let (discriminant, has_value) = union_arm(variant)?;
        if has_value {
            sizes.push(quote! {
                Self::#ident(value) => 4 + ::nfs4_types::xdr_codec::Pack::packed_size(value),
            });
            packs.push(quote! {
                Self::#ident(value) => {
                    let written = ::nfs4_types::xdr_codec::Pack::pack(&#discriminant, out)?;
                    Ok(written + ::nfs4_types::xdr_codec::Pack::pack(value, out)?)
                }
            });
            unpacks.push(quote! {
                #discriminant => {
                    let (value, n) = ::nfs4_types::xdr_codec::Unpack::unpack(input)?;
                    Ok((Self::#ident(value), read + n))
                }
            });
        } else {
            sizes.push(quote! { Self::#ident => 4, });
            packs.push(quote! {
                Self::#ident => ::nfs4_types::xdr_codec::Pack::pack(&#discriminant, out),
            });
            unpacks.push(quote! { #discriminant => Ok((Self::#ident, read)), });
        }
    }

    Ok(CodecBodies {
        packed_size: quote! { match self { #(#sizes)* } },
        pack: quote! { match self { #(#packs)* } },
        unpack: quote! {
            let (discriminant, read): (u32, usize) =
                ::nfs4_types::xdr_codec::Unpack::unpack(input)?;
            match discriminant {
                #(#unpacks)*
                other => Err(::nfs4_types::xdr_codec::Error::InvalidEnumValue(other)),
            }
        },
    })
}

fn codec_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let bodies = match &input.data {
        Data::Struct(data) => struct_bodies(&data.fields),
        Data::Enum(data) if data.variants.iter().all(|v| matches!(v.fields, Fields::Unit))
            && data.variants.iter().all(|v| xdr_discriminant(&v.attrs).is_none()) =>
        {
            simple_enum_bodies(data)
        }
        Data::Enum(data) => union_bodies(data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "XdrCodec can only be derived for structs and enums",
            ));
        }
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let CodecBodies {
        packed_size,
        pack,
        unpack,
    } = bodies;

    Ok(quote! {
        impl #impl_generics ::nfs4_types::xdr_codec::Pack for #name #ty_generics #where_clause {
            fn packed_size(&self) -> usize {
                #packed_size
            }

            fn pack(
                &self,
                out: &mut impl ::std::io::Write,
            ) -> ::nfs4_types::xdr_codec::Result<usize> {
                #pack
            }
        }

        impl #impl_generics ::nfs4_types::xdr_codec::Unpack for #name #ty_generics #where_clause {
            fn unpack(
                input: &mut impl ::std::io::Read,
            ) -> ::nfs4_types::xdr_codec::Result<(Self, usize)> {
                #unpack
            }
        }
    })
}

#[proc_macro_derive(XdrCodec, attributes(xdr))]
pub fn derive_xdr_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    codec_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
