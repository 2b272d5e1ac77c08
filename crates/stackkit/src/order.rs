//! Stack ordering.
//!
//! Stacks with an explicit `order` run first, ascending. Stacks without
//! one follow in the order they were requested, each getting a synthetic
//! priority just above the highest explicit order seen.

use crate::model::Config;

/// Order `stack_names` for execution. Names not declared in `config` are dropped.
pub fn order_stacks(config: &Config, stack_names: &[String]) -> Vec<String> {
    let mut ordered: Vec<(f64, &String)> = Vec::with_capacity(stack_names.len());
    let mut unordered: Vec<&String> = Vec::new();
    let mut max_order = 0.0_f64;

    for name in stack_names {
        let Some(stack) = config.stack(name) else {
            continue;
        };

        match stack.explicit_order() {
            Some(order) => {
                max_order = max_order.max(order);
                ordered.push((order, name));
            }
            None => unordered.push(name),
        }
    }

    for name in unordered {
        max_order += 1.0;
        ordered.push((max_order, name));
    }

    // sort_by is stable, so equal orders keep their input position
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    ordered.into_iter().map(|(_, name)| name.clone()).collect()
}
