use std::fmt;

/// Stable layer identity. Never reused within a project, never renumbered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// Position of a feature within its layer's feature list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u32);

impl FeatureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

/// Correlates a rendered mesh back to the feature (and layer) it came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureTag {
    pub layer: LayerId,
    pub feature: FeatureId,
}

impl FeatureTag {
    pub fn new(layer: LayerId, feature: FeatureId) -> Self {
        Self { layer, feature }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/feature#{}", self.layer, self.feature.0)
    }
}
