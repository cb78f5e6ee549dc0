#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use nfs4_types::xdr_codec::{Error, Opaque, Pack, Unpack, XdrCodec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, XdrCodec)]
#[repr(u32)]
enum TestEnum {
    Field1 = 1,
    Field2 = 2,
    Field3 = 0x1234_5678,
}

#[test]
fn enum_pack() {
    let mut bytes = Vec::new();
    let len = TestEnum::Field1.pack(&mut bytes).unwrap();
    assert_eq!(TestEnum::Field1.packed_size(), 4);
    assert_eq!(len, 4);
    assert_eq!(bytes, [0, 0, 0, 1]);

    let mut bytes = Vec::new();
    TestEnum::Field3.pack(&mut bytes).unwrap();
    assert_eq!(bytes, [0x12, 0x34, 0x56, 0x78]);
}

#[test]
fn enum_unpack() {
    fn unpack(buf: [u8; 4]) -> TestEnum {
        let (e, len) = TestEnum::unpack(&mut Cursor::new(buf)).unwrap();
        assert_eq!(len, 4);
        e
    }

    assert_eq!(TestEnum::Field1, unpack([0, 0, 0, 1]));
    assert_eq!(TestEnum::Field2, unpack([0, 0, 0, 2]));
    assert_eq!(TestEnum::Field3, unpack([0x12, 0x34, 0x56, 0x78]));
}

#[test]
fn enum_unknown_value() {
    let result = TestEnum::unpack(&mut Cursor::new([0, 0, 0, 7]));
    assert!(matches!(result, Err(Error::InvalidEnumValue(7))));
}

#[derive(Debug, PartialEq, XdrCodec)]
struct SimpleStruct {
    a: u32,
    b: u64,
}

#[derive(Debug, PartialEq, XdrCodec)]
struct NestedStruct {
    inner: SimpleStruct,
    flag: bool,
    name: Opaque<'static>,
}

#[test]
fn nested_struct_layout() {
    let original = NestedStruct {
        inner: SimpleStruct { a: 0x123, b: 1 },
        flag: true,
        name: Opaque::from("abcde"),
    };

    let mut buffer = Vec::new();
    let len = original.pack(&mut buffer).unwrap();
    assert_eq!(original.packed_size(), 28);
    assert_eq!(len, 28);
    assert_eq!(buffer[..16], [0, 0, 1, 0x23, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1]);
    assert_eq!(buffer[16..20], [0, 0, 0, 5]);
    assert_eq!(&buffer[20..], b"abcde\0\0\0");

    let (deserialized, len) = NestedStruct::unpack(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(len, 28);
    assert_eq!(original, deserialized);
}

#[derive(Debug, PartialEq, XdrCodec)]
struct TupleStruct(u32, u32);

#[derive(Debug, PartialEq, XdrCodec)]
struct UnitStruct;

#[test]
fn tuple_and_unit_structs() {
    let mut buffer = Vec::new();
    assert_eq!(TupleStruct(0x123, 0x456).pack(&mut buffer).unwrap(), 8);
    assert_eq!(buffer, [0, 0, 1, 0x23, 0, 0, 4, 0x56]);

    let mut buffer = Vec::new();
    assert_eq!(UnitStruct.pack(&mut buffer).unwrap(), 0);
    assert!(buffer.is_empty());
    let (unit, len) = UnitStruct::unpack(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(unit, UnitStruct);
    assert_eq!(len, 0);
}

#[derive(Debug, PartialEq, XdrCodec)]
enum TestUnion {
    #[xdr(0)]
    Empty,
    #[xdr(5)]
    Number(u32),
    #[xdr(10044)]
    Text(Opaque<'static>),
}

#[test]
fn union_arms() {
    let mut buffer = Vec::new();
    assert_eq!(TestUnion::Empty.pack(&mut buffer).unwrap(), 4);
    assert_eq!(buffer, [0, 0, 0, 0]);

    let mut buffer = Vec::new();
    let value = TestUnion::Number(9);
    assert_eq!(value.packed_size(), 8);
    value.pack(&mut buffer).unwrap();
    assert_eq!(buffer, [0, 0, 0, 5, 0, 0, 0, 9]);

    let mut buffer = Vec::new();
    let value = TestUnion::Text(Opaque::from("a"));
    assert_eq!(value.pack(&mut buffer).unwrap(), 12);
    assert_eq!(buffer[..4], [0, 0, 0x27, 0x3c]);

    let (decoded, len) = TestUnion::unpack(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(len, 12);
    assert_eq!(decoded, value);
}

#[test]
fn union_unknown_arm() {
    let result = TestUnion::unpack(&mut Cursor::new([0, 0, 0, 1]));
    assert!(matches!(result, Err(Error::InvalidEnumValue(1))));
}

#[test]
fn truncated_input() {
    let result = SimpleStruct::unpack(&mut Cursor::new([0, 0, 0, 1, 0, 0]));
    assert!(matches!(result, Err(Error::Io(_))));

    let result = Opaque::unpack(&mut Cursor::new([0, 0, 0, 9, b'a']));
    assert!(matches!(result, Err(Error::Io(_))));
}
