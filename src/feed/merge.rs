use super::fetcher::FetchResult;
use super::parser::NormalizedItem;

/// Sorts items newest first.
///
/// The sort is stable, and items without a date rank as the oldest, so they
/// trail the dated ones in their original relative order.
pub fn sort_items(items: &mut [NormalizedItem]) {
    // Option orders None below Some, so reversing the comparison puts
    // absent dates last.
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Combines per-feed batches into one date-sorted list.
///
/// Batches are concatenated in the order given, then sorted with
/// [`sort_items`]. With `cap` set, only the first `cap` items survive.
pub fn merge<I>(batches: I, cap: Option<usize>) -> Vec<NormalizedItem>
where
    I: IntoIterator<Item = Vec<NormalizedItem>>,
{
    let mut items: Vec<NormalizedItem> = batches.into_iter().flatten().collect();
    sort_items(&mut items);

    if let Some(cap) = cap {
        items.truncate(cap);
    }
    items
}

/// Outcome of collecting a round of fetches.
#[derive(Debug, Default)]
pub struct Collected {
    /// Item batches of the feeds that succeeded, in input order.
    pub batches: Vec<Vec<NormalizedItem>>,
    /// URL and error message of every feed that failed.
    pub failures: Vec<(String, String)>,
}

/// Splits fetch results into item batches and failures.
///
/// Each failure is logged as a warning naming its feed; it never affects
/// the other feeds.
pub fn collect_results(results: Vec<FetchResult>) -> Collected {
    let mut collected = Collected::default();

    for FetchResult { url, result } in results {
        match result {
            Ok(items) => {
                tracing::info!(feed = %url, items = items.len(), "Fetched feed");
                collected.batches.push(items);
            }
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Skipping feed");
                collected.failures.push((url, e.to_string()));
            }
        }
    }

    collected
}
