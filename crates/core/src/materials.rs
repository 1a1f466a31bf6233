//! Read-time projection of a course's materials onto a learner's tier.

use crate::model::{ContentLevel, Material, Progress};

/// Returns the materials visible at `allowed`, preserving course order.
///
/// A material is visible when its level's ordinal does not exceed the allowed
/// tier's ordinal. Untagged materials are always visible.
#[must_use]
pub fn visible_materials(allowed: ContentLevel, materials: &[Material]) -> Vec<Material> {
    materials
        .iter()
        .filter(|m| is_visible(allowed, m))
        .cloned()
        .collect()
}

#[must_use]
pub fn is_visible(allowed: ContentLevel, material: &Material) -> bool {
    material
        .level
        .is_none_or(|level| level.ordinal() <= allowed.ordinal())
}

/// Tier to filter with for a learner, falling back to the most restrictive
/// view when there is no progress record for the course.
#[must_use]
pub fn effective_level(progress: Option<&Progress>) -> ContentLevel {
    progress.map_or(ContentLevel::Basic, Progress::allowed_content_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, KnowledgeLevel, MaterialId, UserId};
    use crate::time::fixed_now;

    fn material(id: u64, level: Option<ContentLevel>) -> Material {
        Material {
            id: MaterialId::new(id),
            kind: None,
            title: format!("Material {id}"),
            url: None,
            duration: None,
            rating: None,
            level,
        }
    }

    fn catalogue() -> Vec<Material> {
        vec![
            material(1, Some(ContentLevel::Basic)),
            material(2, Some(ContentLevel::Intermediate)),
            material(3, Some(ContentLevel::Advanced)),
            material(4, None),
        ]
    }

    fn ids(materials: &[Material]) -> Vec<u64> {
        materials.iter().map(|m| m.id.value()).collect()
    }

    #[test]
    fn basic_sees_basic_and_untagged() {
        assert_eq!(ids(&visible_materials(ContentLevel::Basic, &catalogue())), [1, 4]);
    }

    #[test]
    fn intermediate_excludes_advanced() {
        assert_eq!(
            ids(&visible_materials(ContentLevel::Intermediate, &catalogue())),
            [1, 2, 4]
        );
    }

    #[test]
    fn advanced_sees_everything() {
        assert_eq!(
            ids(&visible_materials(ContentLevel::Advanced, &catalogue())),
            [1, 2, 3, 4]
        );
    }

    #[test]
    fn never_returns_material_above_tier() {
        for allowed in ContentLevel::ALL {
            for m in visible_materials(allowed, &catalogue()) {
                if let Some(level) = m.level {
                    assert!(level.ordinal() <= allowed.ordinal());
                }
            }
        }
    }

    #[test]
    fn untagged_material_always_included() {
        let only_untagged = vec![material(9, None)];
        for allowed in ContentLevel::ALL {
            assert_eq!(visible_materials(allowed, &only_untagged).len(), 1);
        }
    }

    #[test]
    fn missing_progress_defaults_to_basic() {
        assert_eq!(effective_level(None), ContentLevel::Basic);

        let mut progress = Progress::new(UserId::new(1), CourseId::new(1), fixed_now());
        progress.select_knowledge_level(KnowledgeLevel::Intermediate, fixed_now());
        assert_eq!(effective_level(Some(&progress)), ContentLevel::Intermediate);
    }
}
