//! # Peers and Write Authority
//!
//! Every process in a match is a [`Peer`]. Exactly one of them is the
//! authority; the rest observe. Writing replicated state requires a
//! [`WriteCapability`], and only an authoritative peer can mint one, so an
//! observer holding a store cannot even express a write.

/// Identifier of a process taking part in a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// What a peer is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PeerRole {
    /// Owns the simulation; runs the decision phase.
    Authority = 0,
    /// Mirrors replicated state; runs presentation only.
    Observer = 1,
}

/// A process in the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    id: PeerId,
    role: PeerRole,
}

impl Peer {
    /// Creates the authoritative peer.
    #[must_use]
    pub const fn authority(id: u32) -> Self {
        Self {
            id: PeerId(id),
            role: PeerRole::Authority,
        }
    }

    /// Creates an observing peer.
    #[must_use]
    pub const fn observer(id: u32) -> Self {
        Self {
            id: PeerId(id),
            role: PeerRole::Observer,
        }
    }

    /// Peer identifier.
    #[inline]
    #[must_use]
    pub const fn id(self) -> PeerId {
        self.id
    }

    /// Peer role.
    #[inline]
    #[must_use]
    pub const fn role(self) -> PeerRole {
        self.role
    }

    /// True for the authoritative peer.
    #[inline]
    #[must_use]
    pub const fn is_authority(self) -> bool {
        matches!(self.role, PeerRole::Authority)
    }

    /// Mints a write capability. Observers get `None`.
    #[must_use]
    pub const fn write_capability(self) -> Option<WriteCapability> {
        if self.is_authority() {
            Some(WriteCapability { holder: self.id })
        } else {
            None
        }
    }
}

/// Proof that the caller is the authoritative peer.
///
/// Not constructible outside [`Peer::write_capability`].
#[derive(Debug, PartialEq, Eq)]
pub struct WriteCapability {
    holder: PeerId,
}

impl WriteCapability {
    /// The peer this capability was minted for.
    #[inline]
    #[must_use]
    pub const fn holder(&self) -> PeerId {
        self.holder
    }
}
