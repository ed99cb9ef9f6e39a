//! Overview range resolution and pagination
//!
//! A caller asks for a window of article numbers, optionally limited to a
//! `slice` of the most recent (negative) or earliest (positive) articles.
//! The server only guarantees its *active* range, which can move between
//! calls and may contain gaps. [`resolve`] clamps a request to the active
//! range, and [`paginate`] keeps fetching adjacent windows until the
//! requested number of rows is collected or the active range is exhausted.
//!
//! The active range is read once per [`paginate`] call and held fixed for
//! every extension fetch.

use async_trait::async_trait;
use tracing::trace;

use crate::article::Overview;
use crate::error::Result;
use crate::group::ActiveRange;

/// Requested article window
///
/// `low`/`high` of `None` (or zero) mean "use the active bound". `slice`
/// limits the window size: negative keeps the most recent `|slice|`
/// articles, positive keeps the earliest `slice` starting at `low`, and
/// `None`/zero uses the active range as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    /// Lowest wanted article number
    pub low: Option<u64>,
    /// Highest wanted article number
    pub high: Option<u64>,
    /// Signed window size limit
    pub slice: Option<i64>,
}

impl Range {
    /// The most recent `n` articles
    pub fn latest(n: u64) -> Self {
        Self {
            slice: Some(-(n as i64)),
            ..Default::default()
        }
    }

    /// The earliest `n` articles at or after `low`
    pub fn from(low: u64, n: u64) -> Self {
        Self {
            low: Some(low),
            slice: Some(n as i64),
            ..Default::default()
        }
    }

    fn effective_slice(&self) -> Option<i64> {
        self.slice.filter(|s| *s != 0)
    }
}

/// A resolved, non-empty window inside the active range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First article number
    pub low: u64,
    /// Last article number (inclusive)
    pub high: u64,
    /// Slice carried over from the request
    pub slice: Option<i64>,
}

impl Window {
    /// Number of article numbers covered
    pub fn size(&self) -> u64 {
        (self.high - self.low).saturating_add(1)
    }

    /// XOVER range argument (`low-high`)
    pub fn wire_range(&self) -> String {
        format!("{}-{}", self.low, self.high)
    }

    /// The adjacent window one slice further, clamped to `active`
    ///
    /// Returns `None` when there is no slice or when the shifted window
    /// leaves the active range. A shifted window always lies strictly
    /// beyond this one in the slice direction, so repeated shifts end.
    pub fn shift(&self, active: &ActiveRange) -> Option<Window> {
        let slice = self.slice.filter(|s| *s != 0)?;
        let step = slice.unsigned_abs();
        let (low, high) = if slice > 0 {
            let low = self.low.checked_add(step)?;
            if low > active.high {
                return None;
            }
            (low.max(active.low), self.high.saturating_add(step).min(active.high))
        } else {
            let high = self.high.checked_sub(step)?;
            if high < active.low {
                return None;
            }
            (self.low.saturating_sub(step).max(active.low), high.min(active.high))
        };
        (low <= high).then_some(Window {
            low,
            high,
            slice: self.slice,
        })
    }
}

/// Clamp a requested range to the active range
///
/// Returns `None` for an empty group or a request entirely above the
/// active range. Otherwise the window satisfies
/// `active.low <= low <= high <= active.high`, and its size is at most
/// `|slice|` when a slice is given.
///
/// ```
/// use nntp_reader::{resolve, ActiveRange, Range};
///
/// let active = ActiveRange::new(100, 200);
///
/// let w = resolve(&Range::latest(10), &active).unwrap();
/// assert_eq!((w.low, w.high), (191, 200));
///
/// let w = resolve(&Range::from(150, 10), &active).unwrap();
/// assert_eq!((w.low, w.high), (150, 159));
///
/// assert!(resolve(&Range::default(), &ActiveRange::new(5, 4)).is_none());
/// ```
pub fn resolve(range: &Range, active: &ActiveRange) -> Option<Window> {
    if active.is_empty() {
        return None;
    }
    let low = range
        .low
        .filter(|l| *l > 0)
        .map_or(active.low, |l| l.max(active.low));
    if low > active.high {
        return None;
    }
    let mut high = range
        .high
        .filter(|h| *h > 0)
        .map_or(active.high, |h| h.min(active.high));
    if high < low {
        high = low;
    }
    let mut low = low;

    let slice = range.effective_slice();
    if let Some(slice) = slice {
        let limit = slice.unsigned_abs();
        if high - low >= limit {
            if slice < 0 {
                low = high + 1 - limit;
            } else {
                high = low + limit - 1;
            }
        }
    }
    Some(Window { low, high, slice })
}

/// Where [`paginate`] gets overview rows for a window
#[async_trait]
pub trait OverviewSource: Send {
    /// Fetch the overview rows for `window`
    async fn fetch(&mut self, window: &Window) -> Result<Vec<Overview>>;
}

/// Fetch the overview rows for `range`, extending across gaps
///
/// One fetch is issued for the resolved window. When a slice is set and
/// fewer rows than the window size come back, the window is shifted by the
/// slice and fetched again, sequentially, prepending (negative slice) or
/// appending (positive slice) the new rows, until enough rows are collected
/// or the window leaves the active range. Surplus rows are trimmed from the
/// side opposite the requested direction.
///
/// # Errors
///
/// Propagates the first error returned by `source`.
pub async fn paginate(
    range: &Range,
    active: &ActiveRange,
    source: &mut dyn OverviewSource,
) -> Result<Vec<Overview>> {
    let Some(mut window) = resolve(range, active) else {
        trace!("Empty window for {:?} in {}-{}", range, active.low, active.high);
        return Ok(Vec::new());
    };
    let desired = window.slice.map(|_| usize::try_from(window.size()).unwrap_or(usize::MAX));

    let mut rows = source.fetch(&window).await?;
    let Some(desired) = desired else {
        return Ok(rows);
    };
    let backwards = window.slice.is_some_and(|s| s < 0);

    while rows.len() < desired {
        let Some(next) = window.shift(active) else {
            break;
        };
        window = next;
        trace!(
            "Extending overview to {} ({} of {} rows)",
            window.wire_range(),
            rows.len(),
            desired
        );
        let mut more = source.fetch(&window).await?;
        if backwards {
            more.append(&mut rows);
            rows = more;
        } else {
            rows.append(&mut more);
        }
    }

    if rows.len() > desired {
        if backwards {
            rows.drain(..rows.len() - desired);
        } else {
            rows.truncate(desired);
        }
    }
    Ok(rows)
}
