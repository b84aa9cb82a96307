//! Weighted project selection and capacity checks.

use rand::Rng;
use tracing::{debug, info};

use dumbq_catalog::{Catalog, PreferenceOverrides, ProjectSpec};

/// One slot per core; a slot is free while fewer run records exist than
/// slots. Observed load does not enter the decision.
pub fn has_free_slot(active: usize, total_slots: u32) -> bool {
    active < total_slots as usize
}

/// Roll the admission dice and pick a project.
///
/// Draws one uniform integer in `[0, 99]` and delegates to
/// [`pick_with_draw`]. Returns `None` only for an empty catalog.
pub fn pick_project<'a, R: Rng>(
    catalog: &'a Catalog,
    overrides: &PreferenceOverrides,
    rng: &mut R,
) -> Option<&'a ProjectSpec> {
    let draw = rng.random_range(0..100);
    pick_with_draw(catalog, overrides, draw)
}

/// Deterministic core of the admission roll.
///
/// Walks the catalog in declaration order accumulating effective chances;
/// the first project whose cumulative sum reaches the draw wins. Because
/// overrides substitute weights without renormalizing, the cumulative sum
/// may total less than 100 — in that case the last project wins, so a
/// non-empty catalog always yields a winner.
pub fn pick_with_draw<'a>(
    catalog: &'a Catalog,
    overrides: &PreferenceOverrides,
    draw: u32,
) -> Option<&'a ProjectSpec> {
    let mut cumulative = 0u32;

    for project in catalog.projects() {
        let chance = match overrides.override_for(&project.name) {
            Some(chance) => {
                info!(
                    project = %project.name,
                    base = project.chance,
                    chance,
                    "preferred chance overrides catalog"
                );
                chance
            }
            None => project.chance,
        };
        cumulative += chance;

        if draw <= cumulative {
            debug!(project = %project.name, draw, cumulative, "admission roll won");
            return Some(project);
        }
    }

    // Undershoot: no cumulative sum reached the draw. Deterministic
    // fallback to the last declared project.
    let last = catalog.projects().last()?;
    debug!(project = %last.name, draw, cumulative, "admission roll fell through to last project");
    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::path::Path;

    fn catalog(content: &str) -> Catalog {
        Catalog::parse(Path::new("test.conf"), content).unwrap()
    }

    fn eighty_twenty() -> Catalog {
        catalog("heavy:80:repo:boot.sh\nlight:20:repo:boot.sh\n")
    }

    #[test]
    fn free_slot_accounting() {
        assert!(has_free_slot(0, 2));
        assert!(has_free_slot(1, 2));
        assert!(!has_free_slot(2, 2));
        assert!(!has_free_slot(3, 2));
    }

    #[test]
    fn every_draw_yields_a_winner() {
        let catalog = eighty_twenty();
        let overrides = PreferenceOverrides::default();
        for draw in 0..100 {
            assert!(
                pick_with_draw(&catalog, &overrides, draw).is_some(),
                "draw {draw} produced no winner"
            );
        }
    }

    #[test]
    fn draw_boundaries_follow_declaration_order() {
        let catalog = eighty_twenty();
        let overrides = PreferenceOverrides::default();

        assert_eq!(pick_with_draw(&catalog, &overrides, 0).unwrap().name, "heavy");
        assert_eq!(pick_with_draw(&catalog, &overrides, 80).unwrap().name, "heavy");
        assert_eq!(pick_with_draw(&catalog, &overrides, 81).unwrap().name, "light");
        assert_eq!(pick_with_draw(&catalog, &overrides, 99).unwrap().name, "light");
    }

    #[test]
    fn undershoot_falls_back_to_last_project() {
        let catalog = eighty_twenty();
        // Crush both weights so the cumulative sum never reaches a high draw.
        let overrides = PreferenceOverrides::from_pairs([("*", 1u32)]);
        let winner = pick_with_draw(&catalog, &overrides, 99).unwrap();
        assert_eq!(winner.name, "light");
    }

    #[test]
    fn override_shifts_the_boundary() {
        let catalog = eighty_twenty();
        let overrides = PreferenceOverrides::from_pairs([("heavy", 10u32)]);
        // heavy now covers draws 0..=10 only.
        assert_eq!(pick_with_draw(&catalog, &overrides, 10).unwrap().name, "heavy");
        assert_eq!(pick_with_draw(&catalog, &overrides, 11).unwrap().name, "light");
    }

    #[test]
    fn overshoot_keeps_first_matching_project() {
        let catalog = eighty_twenty();
        // Boost both past 100 total; the first project soaks up every draw.
        let overrides = PreferenceOverrides::from_pairs([("*", 100u32)]);
        for draw in [0, 50, 99] {
            assert_eq!(
                pick_with_draw(&catalog, &overrides, draw).unwrap().name,
                "heavy"
            );
        }
    }

    #[test]
    fn distribution_converges_to_catalog_weights() {
        let catalog = eighty_twenty();
        let overrides = PreferenceOverrides::default();
        let mut rng = SmallRng::seed_from_u64(0x00d1ce);

        const DRAWS: u32 = 20_000;
        let mut heavy = 0u32;
        for _ in 0..DRAWS {
            if pick_project(&catalog, &overrides, &mut rng).unwrap().name == "heavy" {
                heavy += 1;
            }
        }

        // Inclusive boundary gives heavy draws 0..=80, i.e. 81%.
        let ratio = f64::from(heavy) / f64::from(DRAWS);
        assert!(
            (ratio - 0.81).abs() < 0.02,
            "heavy ratio {ratio} drifted from expected 0.81"
        );
    }

    #[test]
    fn single_project_always_wins() {
        let catalog = catalog("only:100:repo:boot.sh\n");
        let overrides = PreferenceOverrides::default();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(
                pick_project(&catalog, &overrides, &mut rng).unwrap().name,
                "only"
            );
        }
    }
}
