//! Turns the pool's configuration into per-item probabilities and a
//! [`SearchLine`].

use std::{collections::BTreeMap, sync::Arc};

use drawpool_core::Rarity;
use itertools::Itertools;

use crate::{error::PoolError, item::Item, search::SearchLine};

/// Slack allowed when comparing probability sums against 1.
pub const PROBABILITY_EPSILON: f64 = 1e-12;

fn check_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn validate<T>(
    items: &[Arc<Item<T>>],
    rarity_probabilities: &BTreeMap<Rarity, f64>,
) -> Result<(), PoolError> {
    if items.iter().all(|item| item.is_nothing()) {
        return Err(PoolError::EmptyPool);
    }
    for item in items {
        for value in [item.preset_probability(), item.ratio_in_rarity()]
            .into_iter()
            .flatten()
        {
            if !check_probability(value) {
                return Err(PoolError::InvalidItemProbability {
                    item: item.id(),
                    value,
                });
            }
        }
    }
    for (&rarity, &value) in rarity_probabilities {
        if !check_probability(value) {
            return Err(PoolError::InvalidRarityProbability { rarity, value });
        }
    }
    Ok(())
}

/// Working copy of one item's probability. Items are only written once the
/// whole build has succeeded.
struct Slot<'a, T> {
    item: &'a Arc<Item<T>>,
    probability: f64,
}

/// Hands the target mass of every configured rarity to its items that have no
/// preset. Ratio items take `target * ratio`; the others split the rest evenly.
fn allocate_rarities<T>(
    slots: &mut [Slot<'_, T>],
    rarity_probabilities: &BTreeMap<Rarity, f64>,
) -> Result<(), PoolError> {
    let mut by_rarity = slots
        .iter_mut()
        .filter(|slot| !slot.item.is_fixed_probability())
        .into_group_map_by(|slot| slot.item.rarity());

    for (&rarity, &target) in rarity_probabilities {
        if target == 0.0 {
            continue;
        }
        let Some(group) = by_rarity.get_mut(&rarity) else {
            continue;
        };

        let ratio_total: f64 = group
            .iter()
            .filter_map(|slot| slot.item.ratio_in_rarity())
            .sum();
        if ratio_total > 1.0 + PROBABILITY_EPSILON {
            return Err(PoolError::RatioOverflow {
                rarity,
                total: ratio_total,
            });
        }

        let even_count = group
            .iter()
            .filter(|slot| slot.item.ratio_in_rarity().is_none())
            .count();
        let even_share = if even_count > 0 {
            (target - target * ratio_total).max(0.0) / even_count as f64
        } else {
            0.0
        };

        for slot in group.iter_mut() {
            slot.probability = match slot.item.ratio_in_rarity() {
                Some(ratio) => target * ratio,
                None => even_share,
            };
        }
    }
    Ok(())
}

/// Recomputes `real_probability` of every item and lays out the search line.
///
/// `remainder` is the sentinel that receives leftover mass when every real
/// item already has some. It is placed last on the line. On error no item is
/// touched.
pub(crate) fn build<T>(
    items: &[Arc<Item<T>>],
    rarity_probabilities: &BTreeMap<Rarity, f64>,
    remainder: &Arc<Item<T>>,
) -> Result<SearchLine<T>, PoolError> {
    validate(items, rarity_probabilities)?;

    let mut slots: Vec<_> = items
        .iter()
        .filter(|item| !item.is_nothing() && !item.is_removed())
        .sorted_by_key(|item| item.rarity())
        .map(|item| Slot {
            item,
            probability: item.preset_probability().unwrap_or(0.0),
        })
        .collect();

    allocate_rarities(&mut slots, rarity_probabilities)?;

    let allocated: f64 = slots.iter().map(|slot| slot.probability).sum();
    let remaining = 1.0 - allocated;
    if remaining < -PROBABILITY_EPSILON {
        return Err(PoolError::ProbabilityOverflow { total: allocated });
    }

    let mut leftover = 0.0;
    if remaining > PROBABILITY_EPSILON {
        let unallocated: Vec<_> = slots
            .iter_mut()
            .filter(|slot| !slot.item.is_fixed_probability() && slot.probability == 0.0)
            .collect();
        if unallocated.is_empty() {
            leftover = remaining;
        } else {
            let share = remaining / unallocated.len() as f64;
            for slot in unallocated {
                slot.probability = share;
            }
        }
    }

    for item in items {
        item.set_real_probability(0.0);
    }
    for slot in &slots {
        slot.item.set_real_probability(slot.probability);
    }
    remainder.set_real_probability(leftover);

    let mut ordered: Vec<_> = slots.iter().map(|slot| slot.item.clone()).collect();
    if leftover > 0.0 {
        ordered.push(remainder.clone());
    }
    Ok(SearchLine::from_items(&ordered, remainder.clone()))
}
