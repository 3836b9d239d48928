use super::GrowthClass;

/// Generic optimization hints for a growth class. Classes up to
/// O(n log n) carry none.
pub fn for_class(class: GrowthClass) -> &'static [&'static str] {
    match class {
        GrowthClass::Constant
        | GrowthClass::Logarithmic
        | GrowthClass::Linear
        | GrowthClass::Linearithmic => &[],
        GrowthClass::Quadratic => &[
            "Replace the inner loop with a set or dict lookup to bring the work down to O(n)",
            "Sort once and use two pointers or binary search instead of comparing every pair",
        ],
        GrowthClass::Cubic => &[
            "Use dynamic programming or memoization to reuse results computed in the inner loops",
            "Apply loop reduction: precompute intermediate results outside the innermost loop",
        ],
        GrowthClass::Polynomial => &[
            "Deep loop nesting suggests brute-force search; restructure with dynamic programming",
            "Apply loop reduction: precompute lookups so each nesting level does constant work",
        ],
        GrowthClass::Exponential => &[
            "Memoize recursive calls (functools.lru_cache) or convert to bottom-up dynamic programming",
        ],
        GrowthClass::Factorial => &[
            "Prune the search with backtracking constraints or use dynamic programming over subsets",
        ],
    }
}

pub fn nested_loop_without_lookup(function: &str) -> String {
    format!(
        "Function '{function}' nests loops without a set or dict in scope; index one collection in a set or dict to drop a level of nesting"
    )
}

pub fn sort_inside_loop(function: &str) -> String {
    format!("Function '{function}' sorts inside a loop; sort once before the loop")
}
