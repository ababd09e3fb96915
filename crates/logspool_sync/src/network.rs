//! Network conditions and the upload policy applied to them.

/// What the platform reports about the current network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConditions {
    /// A route to the collector exists.
    pub available: bool,
    /// The path is metered (cellular, personal hotspot).
    pub expensive: bool,
    /// The path is in a low-data mode.
    pub constrained: bool,
}

impl NetworkConditions {
    /// An unmetered, unconstrained, reachable network.
    pub const ONLINE: Self = Self {
        available: true,
        expensive: false,
        constrained: false,
    };

    /// No network.
    pub const OFFLINE: Self = Self {
        available: false,
        expensive: false,
        constrained: false,
    };
}

/// Which networks uploads may run on.
///
/// The default excludes expensive and constrained paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkPolicy {
    /// Allow uploads over metered networks.
    pub allow_expensive: bool,
    /// Allow uploads over low-data-mode networks.
    pub allow_constrained: bool,
}

impl NetworkPolicy {
    /// A policy that uploads over any available network.
    pub const ANY: Self = Self {
        allow_expensive: true,
        allow_constrained: true,
    };

    /// Returns true if an upload may start under `conditions`.
    pub fn permits(&self, conditions: &NetworkConditions) -> bool {
        conditions.available
            && (self.allow_expensive || !conditions.expensive)
            && (self.allow_constrained || !conditions.constrained)
    }
}

/// Source of current network conditions.
///
/// Platforms plug in their reachability APIs here.
pub trait NetworkMonitor: Send + Sync {
    /// Returns the conditions right now.
    fn conditions(&self) -> NetworkConditions;
}

/// Monitor for hosts with no reachability API; always reports
/// [`NetworkConditions::ONLINE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl NetworkMonitor for AlwaysOnline {
    fn conditions(&self) -> NetworkConditions {
        NetworkConditions::ONLINE
    }
}
