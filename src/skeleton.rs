//! Arena skeleton.
//!
//! Nodes live in a flat vector sorted parents-first. Each node carries its
//! rest transform, its current local transform, and an optional
//! compensation scale that is applied between the parent's world transform
//! and the node's own local transform:
//!
//! `world(i) = world(parent) * scale(compensation) * local(i)`
//!
//! The compensation slot takes the place of an inserted counter-scale group
//! node, so the hierarchy never changes shape after load.

use std::cell::RefCell;

use glam::{Affine3A, Mat4, Quat, Vec3};

use crate::bone::{BoneRole, RoleSet, WorldCache};
use crate::error::AvatarError;
use crate::math::affine_rotation;

/// Translation / rotation / scale triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Input for one node, with the parent given as an index into the same list
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Transform,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Transform,
    pub local: Transform,
    pub compensation: Option<Vec3>,
    pub role: Option<BoneRole>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    nodes: Vec<Node>,
    bones: [Option<usize>; BoneRole::COUNT],
    /// Nearest humanoid ancestor of each role
    humanoid_parents: [Option<BoneRole>; BoneRole::COUNT],
    present: RoleSet,
    /// Loader index -> arena index
    remap: Vec<usize>,
    root: Transform,
    rest_world: Vec<Affine3A>,
    cache: RefCell<WorldCache>,
}

impl Skeleton {
    /// Build the arena from loader nodes.
    ///
    /// Nodes may arrive in any order; they are re-sorted parents-first and
    /// `bones` indices are remapped accordingly.
    pub fn build(
        specs: Vec<NodeSpec>,
        bones: &[(BoneRole, usize)],
        root_rotation: Quat,
    ) -> Result<Self, AvatarError> {
        let parents: Vec<Option<usize>> = specs.iter().map(|s| s.parent).collect();
        let order = topological_order(&parents)?;

        let mut remap = vec![0usize; specs.len()];
        for (new_index, &old_index) in order.iter().enumerate() {
            remap[old_index] = new_index;
        }

        let mut slots: Vec<Option<NodeSpec>> = specs.into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(slots.len());
        for &old_index in &order {
            let Some(spec) = slots[old_index].take() else {
                continue;
            };
            nodes.push(Node {
                name: spec.name,
                parent: spec.parent.map(|p| remap[p]),
                rest: spec.rest,
                local: spec.rest,
                compensation: None,
                role: None,
            });
        }

        let mut bone_nodes = [None; BoneRole::COUNT];
        let mut present = RoleSet::empty();
        for &(role, old_index) in bones {
            let index = *remap.get(old_index).ok_or_else(|| {
                AvatarError::AssetFormat(format!(
                    "bone '{}' references missing node {}",
                    role.name(),
                    old_index
                ))
            })?;
            if let Some(other) = nodes[index].role {
                return Err(AvatarError::AssetFormat(format!(
                    "node {} is assigned to both '{}' and '{}'",
                    old_index,
                    other.name(),
                    role.name()
                )));
            }
            nodes[index].role = Some(role);
            bone_nodes[role.index()] = Some(index);
            present = present.with(role);
        }

        let mut humanoid_parents = [None; BoneRole::COUNT];
        for role in present.iter() {
            let Some(index) = bone_nodes[role.index()] else {
                continue;
            };
            let mut cursor = nodes[index].parent;
            while let Some(p) = cursor {
                if let Some(parent_role) = nodes[p].role {
                    humanoid_parents[role.index()] = Some(parent_role);
                    break;
                }
                cursor = nodes[p].parent;
            }
        }

        let mut rest_world: Vec<Affine3A> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let local = node.rest.to_affine();
            let world = match node.parent {
                Some(p) => rest_world[p] * local,
                None => local,
            };
            rest_world.push(world);
        }

        let len = nodes.len();
        Ok(Self {
            nodes,
            bones: bone_nodes,
            humanoid_parents,
            present,
            remap,
            root: Transform {
                rotation: root_rotation.normalize(),
                ..Transform::IDENTITY
            },
            rest_world,
            cache: RefCell::new(WorldCache::new(len)),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Arena index of a node given by its position in the loader's list
    pub fn arena_index(&self, loader_index: usize) -> Option<usize> {
        self.remap.get(loader_index).copied()
    }

    /// Arena index of a humanoid role, if the avatar has it
    #[inline]
    pub fn bone(&self, role: BoneRole) -> Option<usize> {
        self.bones[role.index()]
    }

    #[inline]
    pub fn has_bone(&self, role: BoneRole) -> bool {
        self.present.contains(role)
    }

    /// Roles present on this avatar
    pub fn roles(&self) -> RoleSet {
        self.present
    }

    /// Nearest ancestor that is itself a humanoid bone
    pub fn humanoid_parent(&self, role: BoneRole) -> Option<BoneRole> {
        self.humanoid_parents[role.index()]
    }

    pub fn root(&self) -> &Transform {
        &self.root
    }

    pub fn set_root_translation(&mut self, translation: Vec3) {
        if self.root.translation != translation {
            self.root.translation = translation;
            self.cache.get_mut().dirty.mark_all();
        }
    }

    // --- Local transform mutation ---

    pub fn set_scale(&mut self, index: usize, scale: Vec3) {
        if self.nodes[index].local.scale != scale {
            self.nodes[index].local.scale = scale;
            self.mark_dirty(index);
        }
    }

    pub fn set_translation(&mut self, index: usize, translation: Vec3) {
        if self.nodes[index].local.translation != translation {
            self.nodes[index].local.translation = translation;
            self.mark_dirty(index);
        }
    }

    pub fn set_rotation(&mut self, index: usize, rotation: Quat) {
        if self.nodes[index].local.rotation != rotation {
            self.nodes[index].local.rotation = rotation;
            self.mark_dirty(index);
        }
    }

    /// Set the counter-scale slot that sits between `index` and its parent
    pub fn set_compensation(&mut self, index: usize, compensation: Option<Vec3>) {
        if self.nodes[index].compensation != compensation {
            self.nodes[index].compensation = compensation;
            self.mark_dirty(index);
        }
    }

    fn mark_dirty(&mut self, index: usize) {
        let parents = self.nodes.iter().map(|n| n.parent);
        self.cache.get_mut().dirty.mark_subtree(index, parents);
    }

    /// Product of local scales from `from` up to and including `ancestor`.
    ///
    /// Approximates the scale inherited along a short raw chain by treating
    /// every link as axis-aligned. Stops at the root if `ancestor` is never
    /// reached.
    pub fn chain_scale(&self, from: usize, ancestor: usize) -> Vec3 {
        let mut scale = Vec3::ONE;
        let mut cursor = Some(from);
        while let Some(index) = cursor {
            scale *= self.nodes[index].local.scale;
            if index == ancestor {
                break;
            }
            cursor = self.nodes[index].parent;
        }
        scale
    }

    // --- World evaluation ---

    /// World transform of a node (computes lazily)
    pub fn world(&self, index: usize) -> Affine3A {
        self.ensure_computed(index);
        self.cache.borrow().world[index]
    }

    pub fn world_position(&self, index: usize) -> Vec3 {
        Vec3::from(self.world(index).translation)
    }

    pub fn world_rotation(&self, index: usize) -> Quat {
        affine_rotation(&self.world(index))
    }

    pub fn world_scale(&self, index: usize) -> Vec3 {
        let (scale, _, _) = self.world(index).to_scale_rotation_translation();
        scale
    }

    /// World transform of the parent frame `index` hangs from, including its
    /// compensation slot
    pub fn parent_frame(&self, index: usize) -> Affine3A {
        let parent = match self.nodes[index].parent {
            Some(p) => self.world(p),
            None => self.root.to_affine(),
        };
        match self.nodes[index].compensation {
            Some(c) => parent * Affine3A::from_scale(c),
            None => parent,
        }
    }

    /// World transform at load time, without the root transform
    pub fn rest_world(&self, index: usize) -> Affine3A {
        self.rest_world[index]
    }

    pub fn rest_world_rotation(&self, index: usize) -> Quat {
        affine_rotation(&self.rest_world[index])
    }

    /// Rest world transform of the node's raw parent (identity for roots)
    pub fn rest_parent_world(&self, index: usize) -> Affine3A {
        self.nodes[index]
            .parent
            .map(|p| self.rest_world[p])
            .unwrap_or(Affine3A::IDENTITY)
    }

    fn ensure_computed(&self, index: usize) {
        if !self.cache.borrow().dirty.is_dirty(index) {
            return;
        }

        let mut chain = vec![index];
        let mut cursor = self.nodes[index].parent;
        while let Some(p) = cursor {
            if !self.cache.borrow().dirty.is_dirty(p) {
                break;
            }
            chain.push(p);
            cursor = self.nodes[p].parent;
        }

        for &node in chain.iter().rev() {
            self.compute_node(node);
        }
    }

    fn compute_node(&self, index: usize) {
        let node = &self.nodes[index];
        let mut cache = self.cache.borrow_mut();

        let mut frame = match node.parent {
            Some(p) => cache.world[p],
            None => self.root.to_affine(),
        };
        if let Some(c) = node.compensation {
            frame = frame * Affine3A::from_scale(c);
        }

        cache.world[index] = frame * node.local.to_affine();
        cache.dirty.clear(index);
    }

    /// Force recomputation of every node
    pub fn compute_all(&self) {
        for index in 0..self.nodes.len() {
            self.compute_node(index);
        }
    }

    /// World matrices of every node in arena order
    pub fn world_matrices(&self) -> Vec<Mat4> {
        if self.cache.borrow().dirty.is_any_dirty() {
            self.compute_all();
        }
        self.cache.borrow().world.iter().map(|a| Mat4::from(*a)).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self, index: usize) -> bool {
        self.cache.borrow().dirty.is_dirty(index)
    }
}

/// Order node indices so every parent precedes its children.
fn topological_order(parents: &[Option<usize>]) -> Result<Vec<usize>, AvatarError> {
    let n = parents.len();
    let mut depths = Vec::with_capacity(n);

    for i in 0..n {
        let mut depth = 0usize;
        let mut cursor = i;
        while let Some(p) = parents[cursor] {
            if p >= n {
                return Err(AvatarError::AssetFormat(format!(
                    "node {} has out-of-range parent {}",
                    cursor, p
                )));
            }
            depth += 1;
            if depth > n {
                return Err(AvatarError::AssetFormat(format!(
                    "node {} is part of a parent cycle",
                    i
                )));
            }
            cursor = p;
        }
        depths.push(depth);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| depths[i]);
    Ok(order)
}
