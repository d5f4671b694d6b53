use core::fmt;

/// A released XenAPI protocol level, as reported by a host's
/// `API_version_major` / `API_version_minor` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    /// Major number.
    pub major: i64,
    /// Minor number.
    pub minor: i64,
}

/// (major, minor, product, codename)
const RELEASES: &[(i64, i64, &str, &str)] = &[
    (1, 1, "XenServer 4.0", "rio"),
    (1, 2, "XenServer 4.1", "miami"),
    (1, 3, "XenServer 5.0", "orlando"),
    (1, 4, "Unreleased", ""),
    (1, 5, "XenServer 5.0 update 3", ""),
    (1, 6, "XenServer 5.5", "george"),
    (1, 7, "XenServer 5.6", "midnight-ride"),
    (1, 8, "XenServer 5.6 FP1", "cowley"),
    (1, 9, "XenServer 6.0", "boston"),
    (1, 10, "XenServer 6.1", "tampa"),
    (2, 0, "XenServer 6.2", "clearwater"),
    (2, 1, "XenServer 6.2 SP1", "vgpu-productisation"),
    (2, 2, "XenServer 6.2 SP1 Hotfix 4", "clearwater-felton"),
    (2, 3, "XenServer 6.5", "creedence"),
    (2, 4, "XenServer 6.5 SP1", "cream"),
    (2, 5, "XenServer 7.0", "dundee"),
    (2, 6, "XenServer 7.1", "ely"),
    (2, 7, "XenServer 7.2", "falcon"),
    (2, 8, "XenServer 7.3", "inverness"),
    (2, 9, "XenServer 7.4", "jura"),
    (2, 10, "XenServer 7.5", "kolkata"),
    (2, 11, "XenServer 7.6", "lima"),
    (2, 12, "Citrix Hypervisor 8.0", "naples"),
    (2, 13, "Unreleased", "oslo"),
    (2, 14, "Citrix Hypervisor 8.1", "quebec"),
    (2, 15, "Citrix Hypervisor 8.2", "stockholm"),
    (2, 20, "XenServer 8 Preview", "nile-preview"),
    (2, 21, "XenServer 8", "nile"),
];

impl ApiVersion {
    /// XenServer 4.0, the first release of the API.
    pub const RIO: Self = Self::new(1, 1);
    /// The newest release this crate knows about.
    pub const LATEST: Self = Self::new(2, 21);

    /// Build a version from its two components.
    pub const fn new(major: i64, minor: i64) -> Self {
        Self { major, minor }
    }

    /// Every released level, oldest first.
    pub fn known() -> impl Iterator<Item = Self> {
        RELEASES.iter().map(|&(major, minor, _, _)| Self::new(major, minor))
    }

    /// Whether this level matches a known release.
    pub fn is_known(&self) -> bool {
        self.release().is_some()
    }

    /// The product that first shipped this level.
    pub fn product(&self) -> Option<&'static str> {
        self.release().map(|(_, _, product, _)| product)
    }

    /// The release codename (`stockholm`), empty for unnamed releases.
    pub fn codename(&self) -> Option<&'static str> {
        self.release().map(|(_, _, _, codename)| codename)
    }

    fn release(&self) -> Option<(i64, i64, &'static str, &'static str)> {
        RELEASES
            .iter()
            .copied()
            .find(|&(major, minor, _, _)| major == self.major && minor == self.minor)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What [`crate::Session::detect_versions`] learned about the pool coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    /// Protocol level of the coordinator.
    pub api: ApiVersion,
    /// `software_version["xapi"]`, when the host reports it.
    pub xapi: Option<String>,
}
