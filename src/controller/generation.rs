use std::fmt::Display;

/// The remote queries the controller issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Recommendations,
    Search,
    Stats,
    AbArm,
    ItemDetail,
}

impl QueryKind {
    pub const ALL: [QueryKind; 5] = [
        QueryKind::Recommendations,
        QueryKind::Search,
        QueryKind::Stats,
        QueryKind::AbArm,
        QueryKind::ItemDetail,
    ];

    fn index(self) -> usize {
        match self {
            QueryKind::Recommendations => 0,
            QueryKind::Search => 1,
            QueryKind::Stats => 2,
            QueryKind::AbArm => 3,
            QueryKind::ItemDetail => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Recommendations => "recommendations",
            QueryKind::Search => "search",
            QueryKind::Stats => "stats",
            QueryKind::AbArm => "ab_arm",
            QueryKind::ItemDetail => "item_detail",
        }
    }
}

impl Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequence number of one dispatched request within its query kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-kind monotonic counters
///
/// A response may be applied only while its generation is still the latest one
/// handed out for its kind.
#[derive(Debug, Clone, Default)]
pub struct RequestGenerations {
    counters: [u64; QueryKind::ALL.len()],
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next generation for `kind`
    pub fn advance(&mut self, kind: QueryKind) -> Generation {
        let counter = &mut self.counters[kind.index()];
        *counter += 1;
        Generation(*counter)
    }

    /// Latest generation handed out for `kind` (zero if none yet)
    pub fn current(&self, kind: QueryKind) -> Generation {
        Generation(self.counters[kind.index()])
    }

    pub fn is_current(&self, kind: QueryKind, generation: Generation) -> bool {
        self.current(kind) == generation
    }
}
