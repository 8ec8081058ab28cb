use serde::{Deserialize, Serialize};

/// Canonical humanoid bone role.
/// Ordered for topological traversal (parents before children) in a
/// conventionally authored humanoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum BoneRole {
    // Torso
    Hips = 0,
    Spine = 1,
    Chest = 2,
    UpperChest = 3,
    Neck = 4,

    // Head
    Head = 5,
    LeftEye = 6,
    RightEye = 7,
    Jaw = 8,

    // Left arm chain
    LeftShoulder = 9,
    LeftUpperArm = 10,
    LeftLowerArm = 11,
    LeftHand = 12,

    // Right arm chain
    RightShoulder = 13,
    RightUpperArm = 14,
    RightLowerArm = 15,
    RightHand = 16,

    // Left leg chain
    LeftUpperLeg = 17,
    LeftLowerLeg = 18,
    LeftFoot = 19,
    LeftToes = 20,

    // Right leg chain
    RightUpperLeg = 21,
    RightLowerLeg = 22,
    RightFoot = 23,
    RightToes = 24,

    // Left fingers
    LeftThumbMetacarpal = 25,
    LeftThumbProximal = 26,
    LeftThumbDistal = 27,
    LeftIndexProximal = 28,
    LeftIndexIntermediate = 29,
    LeftIndexDistal = 30,
    LeftMiddleProximal = 31,
    LeftMiddleIntermediate = 32,
    LeftMiddleDistal = 33,
    LeftRingProximal = 34,
    LeftRingIntermediate = 35,
    LeftRingDistal = 36,
    LeftLittleProximal = 37,
    LeftLittleIntermediate = 38,
    LeftLittleDistal = 39,

    // Right fingers
    RightThumbMetacarpal = 40,
    RightThumbProximal = 41,
    RightThumbDistal = 42,
    RightIndexProximal = 43,
    RightIndexIntermediate = 44,
    RightIndexDistal = 45,
    RightMiddleProximal = 46,
    RightMiddleIntermediate = 47,
    RightMiddleDistal = 48,
    RightRingProximal = 49,
    RightRingIntermediate = 50,
    RightRingDistal = 51,
    RightLittleProximal = 52,
    RightLittleIntermediate = 53,
    RightLittleDistal = 54,
}

use BoneRole::*;

impl BoneRole {
    /// Total number of humanoid roles
    pub const COUNT: usize = 55;

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// All roles in topological order (parents before children)
    pub const ALL: [BoneRole; Self::COUNT] = [
        Hips, Spine, Chest, UpperChest, Neck,
        Head, LeftEye, RightEye, Jaw,
        LeftShoulder, LeftUpperArm, LeftLowerArm, LeftHand,
        RightShoulder, RightUpperArm, RightLowerArm, RightHand,
        LeftUpperLeg, LeftLowerLeg, LeftFoot, LeftToes,
        RightUpperLeg, RightLowerLeg, RightFoot, RightToes,
        LeftThumbMetacarpal, LeftThumbProximal, LeftThumbDistal,
        LeftIndexProximal, LeftIndexIntermediate, LeftIndexDistal,
        LeftMiddleProximal, LeftMiddleIntermediate, LeftMiddleDistal,
        LeftRingProximal, LeftRingIntermediate, LeftRingDistal,
        LeftLittleProximal, LeftLittleIntermediate, LeftLittleDistal,
        RightThumbMetacarpal, RightThumbProximal, RightThumbDistal,
        RightIndexProximal, RightIndexIntermediate, RightIndexDistal,
        RightMiddleProximal, RightMiddleIntermediate, RightMiddleDistal,
        RightRingProximal, RightRingIntermediate, RightRingDistal,
        RightLittleProximal, RightLittleIntermediate, RightLittleDistal,
    ];

    const NAMES: [&'static str; Self::COUNT] = [
        "hips", "spine", "chest", "upperChest", "neck",
        "head", "leftEye", "rightEye", "jaw",
        "leftShoulder", "leftUpperArm", "leftLowerArm", "leftHand",
        "rightShoulder", "rightUpperArm", "rightLowerArm", "rightHand",
        "leftUpperLeg", "leftLowerLeg", "leftFoot", "leftToes",
        "rightUpperLeg", "rightLowerLeg", "rightFoot", "rightToes",
        "leftThumbMetacarpal", "leftThumbProximal", "leftThumbDistal",
        "leftIndexProximal", "leftIndexIntermediate", "leftIndexDistal",
        "leftMiddleProximal", "leftMiddleIntermediate", "leftMiddleDistal",
        "leftRingProximal", "leftRingIntermediate", "leftRingDistal",
        "leftLittleProximal", "leftLittleIntermediate", "leftLittleDistal",
        "rightThumbMetacarpal", "rightThumbProximal", "rightThumbDistal",
        "rightIndexProximal", "rightIndexIntermediate", "rightIndexDistal",
        "rightMiddleProximal", "rightMiddleIntermediate", "rightMiddleDistal",
        "rightRingProximal", "rightRingIntermediate", "rightRingDistal",
        "rightLittleProximal", "rightLittleIntermediate", "rightLittleDistal",
    ];

    /// Humanoid role name as used in avatar and clip files
    pub const fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    /// Look up a role by its humanoid name
    pub fn from_name(name: &str) -> Option<BoneRole> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
    }

    /// Role for an array index produced by `index()`
    pub fn from_index(index: usize) -> Option<BoneRole> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub const fn is_eye(self) -> bool {
        matches!(self, LeftEye | RightEye)
    }

    #[inline]
    pub const fn is_finger(self) -> bool {
        self.index() >= LeftThumbMetacarpal.index()
    }
}

/// Bitset over bone roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u64);

static_assertions::const_assert!(BoneRole::COUNT <= 64);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn contains(&self, role: BoneRole) -> bool {
        (self.0 & (1 << role.index())) != 0
    }

    #[inline]
    pub fn with(self, role: BoneRole) -> Self {
        Self(self.0 | (1 << role.index()))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in topological order
    pub fn iter(self) -> impl Iterator<Item = BoneRole> {
        BoneRole::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<BoneRole> for RoleSet {
    fn from_iter<I: IntoIterator<Item = BoneRole>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::empty(), RoleSet::with)
    }
}
