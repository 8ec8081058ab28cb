use crate::avatar::Collider;
use crate::bone::BoneRole;
use crate::params::{BodyKey, BodyParameters};
use crate::skeleton::Skeleton;

/// Scale head-region collider radii by headSize.
///
/// Covers colliders on the head itself and on its direct children. Radii
/// are always derived from the load-time value, never from the current one.
pub fn update_collider_radii(colliders: &mut [Collider], skeleton: &Skeleton, params: &BodyParameters) {
    let Some(head) = skeleton.bone(BoneRole::Head) else {
        return;
    };
    let head_size = params.body(BodyKey::HeadSize);

    for collider in colliders.iter_mut() {
        let on_head = collider.node == head || skeleton.node(collider.node).parent == Some(head);
        if on_head {
            collider.shape = collider.shape.with_radius(collider.original_radius * head_size);
        }
    }
}
