//! Client identities, open-owners and open stateids.
//!
//! A client registers with SETCLIENTID and becomes usable after
//! SETCLIENTID_CONFIRM. It then holds a lease that RENEW and any operation
//! using its state extend. Clients whose lease ran out are expired by the
//! [`Cleaner`](crate::cleaner::Cleaner) or lazily on their next request, and
//! lose all their opens.
//!
//! Expired and released client records, and open-owners without opens, are
//! kept for one more lease period and then dropped by the same sweep.
//!
//! Client ids carry the server boot time in the upper 32 bits so ids and
//! stateids of a previous server run are recognised as stale.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use nfs4_types::nfs4::{
    NFS4_OTHER_SIZE, OPEN4_SHARE_ACCESS_BOTH, OPEN4_SHARE_DENY_BOTH, clientid4, nfsstat4,
    open_owner4, seqid4, stateid4, verifier4,
};
use tracing::{debug, info};

use crate::cleaner::Sweep;
use crate::filehandle::HandleId;

pub const DEFAULT_LEASE_TIME: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Unconfirmed,
    Confirmed,
    Expired,
    Released,
}

#[derive(Debug)]
struct ClientRecord {
    name: Vec<u8>,
    verifier: verifier4,
    confirm: verifier4,
    state: ClientState,
    last_renewed: Instant,
    /// When the record became expired or released.
    retired: Option<Instant>,
}

type OwnerKey = (clientid4, Vec<u8>);

#[derive(Debug)]
struct OpenOwner {
    last_seqid: seqid4,
    confirmed: bool,
    last_used: Instant,
}

#[derive(Debug)]
struct OpenState {
    owner: OwnerKey,
    file: HandleId,
    seqid: seqid4,
    share_access: u32,
    share_deny: u32,
}

/// Result of a successful OPEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenGrant {
    pub stateid: stateid4,
    /// The open-owner is new and has to be confirmed with OPEN_CONFIRM.
    pub confirm_required: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_client: u32,
    next_state: u32,
    next_verifier: u64,
    clients: HashMap<clientid4, ClientRecord>,
    owners: HashMap<OwnerKey, OpenOwner>,
    states: HashMap<[u8; NFS4_OTHER_SIZE], OpenState>,
}

impl Inner {
    fn new_verifier(&mut self, boot: u32) -> verifier4 {
        self.next_verifier += 1;
        ((u64::from(boot) << 32) ^ self.next_verifier.wrapping_mul(0x9e37_79b9_7f4a_7c15))
            .to_be_bytes()
    }

    /// Drops every open-owner and stateid of a client.
    fn drop_client_state(&mut self, clientid: clientid4) -> usize {
        self.owners.retain(|(owner_client, _), _| *owner_client != clientid);
        let before = self.states.len();
        self.states.retain(|_, state| state.owner.0 != clientid);
        before - self.states.len()
    }

    fn expire_if_elapsed(&mut self, clientid: clientid4, now: Instant, lease: Duration) {
        let expired = self.clients.get_mut(&clientid).is_some_and(|client| {
            let elapsed = client.state == ClientState::Confirmed
                && now.saturating_duration_since(client.last_renewed) > lease;
            if elapsed {
                client.state = ClientState::Expired;
                client.retired = Some(now);
            }
            elapsed
        });
        if expired {
            let dropped = self.drop_client_state(clientid);
            info!(clientid = format_args!("{clientid:#x}"), dropped, "client lease expired");
        }
    }

    fn confirmed_client(
        &mut self,
        clientid: clientid4,
        now: Instant,
        lease: Duration,
    ) -> Result<&mut ClientRecord, nfsstat4> {
        self.expire_if_elapsed(clientid, now, lease);
        match self.clients.get_mut(&clientid) {
            Some(client) if client.state == ClientState::Confirmed => {
                client.last_renewed = now;
                Ok(client)
            }
            _ => Err(nfsstat4::NFS4ERR_STALE_CLIENTID),
        }
    }

    fn check_owner_seqid(&self, owner: &OwnerKey, seqid: seqid4) -> Result<(), nfsstat4> {
        match self.owners.get(owner) {
            Some(existing) if existing.last_seqid.wrapping_add(1) == seqid => Ok(()),
            Some(_) => Err(nfsstat4::NFS4ERR_BAD_SEQID),
            None => Ok(()),
        }
    }
}

/// Tracks client records and open state. Shared by all connections.
#[derive(Debug)]
pub struct ClientRegistry {
    boot: u32,
    lease: Duration,
    inner: Mutex<Inner>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(lease: Duration) -> Self {
        let boot = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_secs());
        Self::with_boot(u32::try_from(boot % (1 << 32)).unwrap_or_default(), lease)
    }

    /// Creates a registry as if the server booted at `boot` seconds.
    #[must_use]
    pub fn with_boot(boot: u32, lease: Duration) -> Self {
        Self {
            boot,
            lease,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub const fn lease_time(&self) -> Duration {
        self.lease
    }

    #[must_use]
    pub fn lease_seconds(&self) -> u32 {
        u32::try_from(self.lease.as_secs()).unwrap_or(u32::MAX)
    }

    fn is_current(&self, clientid: clientid4) -> bool {
        clientid >> 32 == u64::from(self.boot)
    }

    /// Registers a client, see SETCLIENTID.
    ///
    /// A confirmed client presenting the same verifier keeps its id and gets a
    /// fresh confirm verifier. Anything else starts a new unconfirmed record.
    pub fn set_client_id(&self, name: &[u8], verifier: verifier4, now: Instant) -> (clientid4, verifier4) {
        let mut inner = self.lock();
        let confirm = inner.new_verifier(self.boot);

        let existing = inner.clients.iter_mut().find(|(_, client)| {
            client.state == ClientState::Confirmed && client.name == name && client.verifier == verifier
        });
        if let Some((clientid, client)) = existing {
            client.confirm = confirm;
            client.last_renewed = now;
            return (*clientid, confirm);
        }

        let stale: Vec<clientid4> = inner
            .clients
            .iter()
            .filter(|(_, client)| client.state == ClientState::Unconfirmed && client.name == name)
            .map(|(clientid, _)| *clientid)
            .collect();
        for clientid in stale {
            inner.clients.remove(&clientid);
        }

        inner.next_client = inner.next_client.wrapping_add(1);
        let clientid = (u64::from(self.boot) << 32) | u64::from(inner.next_client);
        inner.clients.insert(
            clientid,
            ClientRecord {
                name: name.to_vec(),
                verifier,
                confirm,
                state: ClientState::Unconfirmed,
                last_renewed: now,
                retired: None,
            },
        );
        debug!(clientid = format_args!("{clientid:#x}"), "client registered");
        (clientid, confirm)
    }

    /// Confirms a client, see SETCLIENTID_CONFIRM. Other records of the same
    /// client are released together with their state.
    pub fn confirm_client_id(
        &self,
        clientid: clientid4,
        confirm: verifier4,
        now: Instant,
    ) -> Result<(), nfsstat4> {
        if !self.is_current(clientid) {
            return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
        }
        let mut inner = self.lock();
        inner.expire_if_elapsed(clientid, now, self.lease);

        let client = inner
            .clients
            .get_mut(&clientid)
            .ok_or(nfsstat4::NFS4ERR_STALE_CLIENTID)?;
        if client.confirm != confirm {
            return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
        }
        match client.state {
            ClientState::Confirmed => {
                client.last_renewed = now;
                return Ok(());
            }
            ClientState::Unconfirmed => {
                client.state = ClientState::Confirmed;
                client.last_renewed = now;
            }
            ClientState::Expired | ClientState::Released => {
                return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
            }
        }

        let name = client.name.clone();
        let released: Vec<clientid4> = inner
            .clients
            .iter_mut()
            .filter(|(id, client)| **id != clientid && client.name == name)
            .filter(|(_, client)| client.state == ClientState::Confirmed)
            .map(|(id, client)| {
                client.state = ClientState::Released;
                client.retired = Some(now);
                *id
            })
            .collect();
        for id in released {
            let dropped = inner.drop_client_state(id);
            debug!(clientid = format_args!("{id:#x}"), dropped, "client released");
        }
        debug!(clientid = format_args!("{clientid:#x}"), "client confirmed");
        Ok(())
    }

    /// Extends the lease of a confirmed client.
    pub fn renew(&self, clientid: clientid4, now: Instant) -> Result<(), nfsstat4> {
        if !self.is_current(clientid) {
            return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
        }
        self.lock().confirmed_client(clientid, now, self.lease).map(|_| ())
    }

    /// Validates the client, seqid and share modes of an OPEN before anything
    /// is created.
    pub fn check_open(
        &self,
        owner: &open_owner4,
        seqid: seqid4,
        share_access: u32,
        share_deny: u32,
        now: Instant,
    ) -> Result<(), nfsstat4> {
        check_share(share_access, share_deny)?;
        if !self.is_current(owner.clientid) {
            return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
        }
        let mut inner = self.lock();
        inner.confirmed_client(owner.clientid, now, self.lease)?;
        inner.check_owner_seqid(&(owner.clientid, owner.owner.to_vec()), seqid)
    }

    /// Records an OPEN of `file`. Opening a file the owner already has open
    /// upgrades the share access of the existing stateid.
    pub fn open(
        &self,
        owner: &open_owner4,
        seqid: seqid4,
        file: HandleId,
        share_access: u32,
        share_deny: u32,
        now: Instant,
    ) -> Result<OpenGrant, nfsstat4> {
        check_share(share_access, share_deny)?;
        if !self.is_current(owner.clientid) {
            return Err(nfsstat4::NFS4ERR_STALE_CLIENTID);
        }
        let mut inner = self.lock();
        inner.confirmed_client(owner.clientid, now, self.lease)?;
        let key: OwnerKey = (owner.clientid, owner.owner.to_vec());
        inner.check_owner_seqid(&key, seqid)?;

        let open_owner = inner.owners.entry(key.clone()).or_insert(OpenOwner {
            last_seqid: seqid,
            confirmed: false,
            last_used: now,
        });
        open_owner.last_seqid = seqid;
        open_owner.last_used = now;
        let confirm_required = !open_owner.confirmed;

        let existing = inner
            .states
            .iter()
            .find(|(_, state)| state.owner == key && state.file == file)
            .map(|(other, _)| *other);
        let stateid = if let Some(other) = existing {
            let state = inner.states.get_mut(&other).ok_or(nfsstat4::NFS4ERR_SERVERFAULT)?;
            state.share_access |= share_access;
            state.share_deny |= share_deny;
            state.seqid = next_seqid(state.seqid);
            stateid4 {
                seqid: state.seqid,
                other,
            }
        } else {
            inner.next_state = inner.next_state.wrapping_add(1);
            let mut other = [0; NFS4_OTHER_SIZE];
            other[..8].copy_from_slice(&owner.clientid.to_be_bytes());
            other[8..].copy_from_slice(&inner.next_state.to_be_bytes());
            inner.states.insert(
                other,
                OpenState {
                    owner: key,
                    file,
                    seqid: 1,
                    share_access,
                    share_deny,
                },
            );
            stateid4 { seqid: 1, other }
        };

        Ok(OpenGrant {
            stateid,
            confirm_required,
        })
    }

    /// OPEN_CONFIRM: confirms the open-owner of `stateid`.
    pub fn open_confirm(
        &self,
        stateid: &stateid4,
        seqid: seqid4,
        file: HandleId,
        now: Instant,
    ) -> Result<stateid4, nfsstat4> {
        self.with_seqid_state(stateid, seqid, file, now, |inner, key, _| {
            if let Some(owner) = inner.owners.get_mut(key) {
                owner.confirmed = true;
            }
            Ok(())
        })
    }

    /// OPEN_DOWNGRADE: reduces the share access and deny of an open.
    pub fn open_downgrade(
        &self,
        stateid: &stateid4,
        seqid: seqid4,
        share_access: u32,
        share_deny: u32,
        file: HandleId,
        now: Instant,
    ) -> Result<stateid4, nfsstat4> {
        check_share(share_access, share_deny)?;
        self.with_seqid_state(stateid, seqid, file, now, |inner, _, other| {
            let state = inner.states.get_mut(other).ok_or(nfsstat4::NFS4ERR_BAD_STATEID)?;
            if share_access & !state.share_access != 0 || share_deny & !state.share_deny != 0 {
                return Err(nfsstat4::NFS4ERR_INVAL);
            }
            state.share_access = share_access;
            state.share_deny = share_deny;
            Ok(())
        })
    }

    /// CLOSE: drops the open. The returned stateid is no longer usable.
    pub fn close(
        &self,
        stateid: &stateid4,
        seqid: seqid4,
        file: HandleId,
        now: Instant,
    ) -> Result<stateid4, nfsstat4> {
        let closed = self.with_seqid_state(stateid, seqid, file, now, |_, _, _| Ok(()))?;
        self.lock().states.remove(&stateid.other);
        Ok(closed)
    }

    /// Common part of the seqid-mutating operations: the owner seqid is
    /// checked first, then the stateid itself. `apply` runs only if both pass.
    fn with_seqid_state(
        &self,
        stateid: &stateid4,
        seqid: seqid4,
        file: HandleId,
        now: Instant,
        apply: impl FnOnce(&mut Inner, &OwnerKey, &[u8; NFS4_OTHER_SIZE]) -> Result<(), nfsstat4>,
    ) -> Result<stateid4, nfsstat4> {
        if stateid.is_special() {
            return Err(nfsstat4::NFS4ERR_BAD_STATEID);
        }
        let mut inner = self.lock();
        let key = self.validate(&mut *inner, stateid, None, now)?;
        inner.check_owner_seqid(&key, seqid)?;
        self.validate(&mut *inner, stateid, Some(file), now)?;

        apply(&mut *inner, &key, &stateid.other)?;
        if let Some(owner) = inner.owners.get_mut(&key) {
            owner.last_seqid = seqid;
            owner.last_used = now;
        }
        let state = inner
            .states
            .get_mut(&stateid.other)
            .ok_or(nfsstat4::NFS4ERR_BAD_STATEID)?;
        state.seqid = next_seqid(state.seqid);
        Ok(stateid4 {
            seqid: state.seqid,
            other: stateid.other,
        })
    }

    /// Checks a stateid presented with READ, WRITE or SETATTR on `file`. The
    /// open must grant every bit of `access`, otherwise `NFS4ERR_OPENMODE`.
    /// The special stateids are always accepted.
    pub fn check_stateid(
        &self,
        stateid: &stateid4,
        file: HandleId,
        access: u32,
        now: Instant,
    ) -> Result<(), nfsstat4> {
        if stateid.is_special() {
            return Ok(());
        }
        let mut inner = self.lock();
        self.validate(&mut *inner, stateid, Some(file), now)?;
        let granted = inner
            .states
            .get(&stateid.other)
            .map_or(0, |state| state.share_access);
        if granted & access == access {
            Ok(())
        } else {
            Err(nfsstat4::NFS4ERR_OPENMODE)
        }
    }

    /// Looks up an open stateid. With `file` set the seqid and the file are
    /// checked as well. Renews the lease of the owning client.
    fn validate(
        &self,
        inner: &mut Inner,
        stateid: &stateid4,
        file: Option<HandleId>,
        now: Instant,
    ) -> Result<OwnerKey, nfsstat4> {
        let mut clientid = [0; 8];
        clientid.copy_from_slice(&stateid.other[..8]);
        let clientid = u64::from_be_bytes(clientid);
        if !self.is_current(clientid) {
            return Err(nfsstat4::NFS4ERR_STALE_STATEID);
        }

        inner.expire_if_elapsed(clientid, now, self.lease);
        let Some(state) = inner.states.get(&stateid.other) else {
            let expired = inner
                .clients
                .get(&clientid)
                .is_some_and(|client| client.state == ClientState::Expired);
            return Err(if expired {
                nfsstat4::NFS4ERR_EXPIRED
            } else {
                nfsstat4::NFS4ERR_BAD_STATEID
            });
        };
        let key = state.owner.clone();

        if let Some(file) = file {
            if stateid.seqid < state.seqid {
                return Err(nfsstat4::NFS4ERR_OLD_STATEID);
            }
            if stateid.seqid > state.seqid || state.file != file {
                return Err(nfsstat4::NFS4ERR_BAD_STATEID);
            }
        }

        if let Some(client) = inner.clients.get_mut(&clientid) {
            client.last_renewed = now;
        }
        Ok(key)
    }

    /// Consumes the seqid of an OPEN that passed [`Self::check_open`] but
    /// failed later, so the client's next request with seqid + 1 is accepted.
    pub fn open_failed(&self, owner: &open_owner4, seqid: seqid4, now: Instant) {
        let mut inner = self.lock();
        inner
            .owners
            .entry((owner.clientid, owner.owner.to_vec()))
            .and_modify(|owner| {
                owner.last_seqid = seqid;
                owner.last_used = now;
            })
            .or_insert(OpenOwner {
                last_seqid: seqid,
                confirmed: false,
                last_used: now,
            });
    }

    /// RELEASE_LOCKOWNER: no locks are ever granted, only the client is checked.
    pub fn release_lock_owner(&self, clientid: clientid4, now: Instant) -> Result<(), nfsstat4> {
        self.renew(clientid, now)
    }

    /// Drops the opens of removed files.
    pub fn forget_files(&self, files: &[HandleId]) {
        if files.is_empty() {
            return;
        }
        let mut inner = self.lock();
        inner.states.retain(|_, state| !files.contains(&state.file));
    }

    /// Expires every client whose lease elapsed and drops records that are
    /// of no further use.
    pub fn expire_clients(&self, now: Instant) {
        let mut inner = self.lock();
        let clientids: Vec<clientid4> = inner.clients.keys().copied().collect();
        for clientid in clientids {
            inner.expire_if_elapsed(clientid, now, self.lease);
        }

        let lease = self.lease;
        let before = inner.clients.len();
        inner.clients.retain(|_, client| match client.state {
            ClientState::Confirmed => true,
            ClientState::Unconfirmed => now.saturating_duration_since(client.last_renewed) <= lease,
            ClientState::Expired | ClientState::Released => client
                .retired
                .is_some_and(|retired| now.saturating_duration_since(retired) <= lease),
        });
        let dropped_clients = before - inner.clients.len();

        let Inner { owners, states, .. } = &mut *inner;
        let before = owners.len();
        owners.retain(|key, owner| {
            now.saturating_duration_since(owner.last_used) <= lease
                || states.values().any(|state| state.owner == *key)
        });
        let dropped_owners = before - owners.len();
        if dropped_clients + dropped_owners > 0 {
            debug!(dropped_clients, dropped_owners, "client records dropped");
        }
    }

    #[cfg(test)]
    fn record_counts(&self) -> (usize, usize, usize) {
        let inner = self.lock();
        (inner.clients.len(), inner.owners.len(), inner.states.len())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sweep for ClientRegistry {
    fn sweep(&self, now: Instant) {
        self.expire_clients(now);
    }
}

const fn next_seqid(seqid: seqid4) -> seqid4 {
    match seqid.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

const fn check_share(share_access: u32, share_deny: u32) -> Result<(), nfsstat4> {
    if share_access == 0 || share_access & !OPEN4_SHARE_ACCESS_BOTH != 0 {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }
    if share_deny & !OPEN4_SHARE_DENY_BOTH != 0 {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use nfs4_types::nfs4::{
        OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_ACCESS_WRITE, OPEN4_SHARE_DENY_NONE,
    };
    use nfs4_types::xdr_codec::Opaque;

    use super::*;

    const LEASE: Duration = Duration::from_secs(90);

    fn confirmed_client(registry: &ClientRegistry, now: Instant) -> clientid4 {
        let (clientid, confirm) = registry.set_client_id(b"client", [1; 8], now);
        registry.confirm_client_id(clientid, confirm, now).unwrap();
        clientid
    }

    fn owner(clientid: clientid4) -> open_owner4 {
        open_owner4 {
            clientid,
            owner: Opaque::from("owner"),
        }
    }

    #[test]
    fn client_ids_carry_boot_time() {
        let registry = ClientRegistry::with_boot(0x1234, LEASE);
        let now = Instant::now();
        let (clientid, _) = registry.set_client_id(b"a", [0; 8], now);
        assert_eq!(clientid >> 32, 0x1234);

        let other_boot = (0x1233_u64 << 32) | 1;
        assert_eq!(registry.renew(other_boot, now), Err(nfsstat4::NFS4ERR_STALE_CLIENTID));
        // unconfirmed clients cannot renew
        assert_eq!(registry.renew(clientid, now), Err(nfsstat4::NFS4ERR_STALE_CLIENTID));
    }

    #[test]
    fn confirm_rules() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let (clientid, confirm) = registry.set_client_id(b"a", [0; 8], now);
        assert_eq!(
            registry.confirm_client_id(clientid, [9; 8], now),
            Err(nfsstat4::NFS4ERR_STALE_CLIENTID)
        );
        registry.confirm_client_id(clientid, confirm, now).unwrap();
        // replayed confirm
        registry.confirm_client_id(clientid, confirm, now).unwrap();
        registry.renew(clientid, now).unwrap();

        // same verifier keeps the id
        let (same, confirm) = registry.set_client_id(b"a", [0; 8], now);
        assert_eq!(same, clientid);
        registry.confirm_client_id(same, confirm, now).unwrap();

        // a reboot of the client replaces the old record once confirmed
        let (new_id, confirm) = registry.set_client_id(b"a", [5; 8], now);
        assert_ne!(new_id, clientid);
        registry.renew(clientid, now).unwrap();
        registry.confirm_client_id(new_id, confirm, now).unwrap();
        assert_eq!(registry.renew(clientid, now), Err(nfsstat4::NFS4ERR_STALE_CLIENTID));
        registry.renew(new_id, now).unwrap();
    }

    #[test]
    fn open_confirm_close() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let clientid = confirmed_client(&registry, now);
        let file = HandleId::ROOT;
        let owner = owner(clientid);

        registry
            .check_open(&owner, 5, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
        let grant = registry
            .open(&owner, 5, file, OPEN4_SHARE_ACCESS_BOTH, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
        assert!(grant.confirm_required);
        assert_eq!(grant.stateid.seqid, 1);
        assert_eq!(grant.stateid.other[..8], clientid.to_be_bytes());

        let confirmed = registry.open_confirm(&grant.stateid, 6, file, now).unwrap();
        assert_eq!(confirmed.seqid, 2);
        // replay of the same seqid
        assert_eq!(
            registry.open_confirm(&grant.stateid, 6, file, now),
            Err(nfsstat4::NFS4ERR_BAD_SEQID)
        );

        registry.check_stateid(&confirmed, file, OPEN4_SHARE_ACCESS_READ, now).unwrap();
        assert_eq!(
            registry.check_stateid(&grant.stateid, file, OPEN4_SHARE_ACCESS_READ, now),
            Err(nfsstat4::NFS4ERR_OLD_STATEID)
        );
        let ahead = stateid4 {
            seqid: 3,
            ..confirmed
        };
        assert_eq!(
            registry.check_stateid(&ahead, file, OPEN4_SHARE_ACCESS_READ, now),
            Err(nfsstat4::NFS4ERR_BAD_STATEID)
        );

        let downgraded = registry
            .open_downgrade(&confirmed, 7, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, file, now)
            .unwrap();
        assert_eq!(
            registry.open_downgrade(&downgraded, 8, OPEN4_SHARE_ACCESS_BOTH, 0, file, now),
            Err(nfsstat4::NFS4ERR_INVAL)
        );

        let closed = registry.close(&downgraded, 8, file, now).unwrap();
        assert_eq!(closed.seqid, downgraded.seqid + 1);
        assert_eq!(
            registry.check_stateid(&downgraded, file, OPEN4_SHARE_ACCESS_READ, now),
            Err(nfsstat4::NFS4ERR_BAD_STATEID)
        );

        // a confirmed owner needs no further confirmation
        let grant = registry
            .open(&owner, 9, file, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
        assert!(!grant.confirm_required);
    }

    #[test]
    fn failed_open_consumes_seqid() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let owner = owner(confirmed_client(&registry, now));

        registry
            .check_open(&owner, 1, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
        registry.open_failed(&owner, 1, now);
        assert_eq!(
            registry.check_open(&owner, 1, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now),
            Err(nfsstat4::NFS4ERR_BAD_SEQID)
        );
        registry
            .open(&owner, 2, HandleId::ROOT, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
    }

    #[test]
    fn stateid_checks() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let clientid = confirmed_client(&registry, now);
        let file = HandleId::ROOT;

        registry
            .check_stateid(&stateid4::ANONYMOUS, file, OPEN4_SHARE_ACCESS_WRITE, now)
            .unwrap();
        registry
            .check_stateid(&stateid4::READ_BYPASS, file, OPEN4_SHARE_ACCESS_READ, now)
            .unwrap();

        let grant = registry
            .open(&owner(clientid), 1, file, OPEN4_SHARE_ACCESS_READ, 0, now)
            .unwrap();
        let mut stale = grant.stateid;
        stale.other[..8].copy_from_slice(&(7u64 << 32).to_be_bytes());
        assert_eq!(
            registry.check_stateid(&stale, file, OPEN4_SHARE_ACCESS_READ, now),
            Err(nfsstat4::NFS4ERR_STALE_STATEID)
        );

        // a read-only open does not allow writes
        registry
            .check_stateid(&grant.stateid, file, OPEN4_SHARE_ACCESS_READ, now)
            .unwrap();
        assert_eq!(
            registry.check_stateid(&grant.stateid, file, OPEN4_SHARE_ACCESS_WRITE, now),
            Err(nfsstat4::NFS4ERR_OPENMODE)
        );

        registry.forget_files(&[file]);
        assert_eq!(
            registry.check_stateid(&grant.stateid, file, OPEN4_SHARE_ACCESS_READ, now),
            Err(nfsstat4::NFS4ERR_BAD_STATEID)
        );
    }

    #[test]
    fn bad_share_access() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let clientid = confirmed_client(&registry, now);
        assert_eq!(
            registry.open(&owner(clientid), 1, HandleId::ROOT, 0, 0, now),
            Err(nfsstat4::NFS4ERR_INVAL)
        );
        assert_eq!(
            registry.open(&owner(clientid), 1, HandleId::ROOT, 4, 0, now),
            Err(nfsstat4::NFS4ERR_INVAL)
        );
    }

    #[test]
    fn lease_expiry_drops_state() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let clientid = confirmed_client(&registry, now);
        let grant = registry
            .open(&owner(clientid), 1, HandleId::ROOT, OPEN4_SHARE_ACCESS_READ, 0, now)
            .unwrap();

        let later = now + LEASE + Duration::from_secs(1);
        registry.sweep(later);
        assert_eq!(registry.renew(clientid, later), Err(nfsstat4::NFS4ERR_STALE_CLIENTID));
        assert_eq!(
            registry.check_stateid(&grant.stateid, HandleId::ROOT, OPEN4_SHARE_ACCESS_READ, later),
            Err(nfsstat4::NFS4ERR_EXPIRED)
        );
        assert_eq!(registry.record_counts(), (1, 0, 0));

        // one more lease period and the expired record is gone too
        let much_later = later + LEASE + Duration::from_secs(1);
        registry.sweep(much_later);
        assert_eq!(registry.record_counts(), (0, 0, 0));
        assert_eq!(
            registry.check_stateid(&grant.stateid, HandleId::ROOT, OPEN4_SHARE_ACCESS_READ, much_later),
            Err(nfsstat4::NFS4ERR_BAD_STATEID)
        );
    }

    #[test]
    fn idle_owners_and_released_clients_are_dropped() {
        let registry = ClientRegistry::with_boot(1, LEASE);
        let now = Instant::now();
        let clientid = confirmed_client(&registry, now);
        let owner = owner(clientid);
        let file = HandleId::ROOT;

        let grant = registry
            .open(&owner, 1, file, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, now)
            .unwrap();
        let confirmed = registry.open_confirm(&grant.stateid, 2, file, now).unwrap();
        registry.close(&confirmed, 3, file, now).unwrap();
        assert_eq!(registry.record_counts(), (1, 1, 0));

        // the client reboots, the old record is released
        let (new_id, confirm) = registry.set_client_id(b"client", [2; 8], now);
        registry.confirm_client_id(new_id, confirm, now).unwrap();
        assert_eq!(registry.record_counts(), (2, 0, 0));

        registry.renew(new_id, now + LEASE).unwrap();
        let later = now + LEASE + Duration::from_secs(1);
        let other = owner4_of(new_id);
        let grant = registry
            .open(&other, 1, file, OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, later)
            .unwrap();
        registry.sweep(later);
        assert_eq!(registry.record_counts(), (1, 1, 1));

        // an owner holding an open stays even when idle
        let even_later = later + LEASE;
        registry.renew(new_id, even_later).unwrap();
        let closed_at = even_later + Duration::from_secs(1);
        registry.sweep(closed_at);
        assert_eq!(registry.record_counts(), (1, 1, 1));

        // after its last CLOSE it goes once it has been idle for a lease
        registry.close(&grant.stateid, 2, file, closed_at).unwrap();
        registry.renew(new_id, even_later + LEASE).unwrap();
        registry.sweep(closed_at + LEASE + Duration::from_secs(1));
        assert_eq!(registry.record_counts(), (1, 0, 0));
    }

    fn owner4_of(clientid: clientid4) -> open_owner4 {
        open_owner4 {
            clientid,
            owner: Opaque::from("another owner"),
        }
    }
}
