//! # Two-level asynchronous iteration.
//!
//! A reusable driver for the shape that keeps coming up when talking to the
//! remote store: an outer loop over work units, an inner loop over the
//! asynchronously fetched results of each unit, and a single completion
//! signal at the end.  The driver guarantees strict ordering: units are
//! visited in input order, one at a time, and the next unit is not fetched
//! until every result of the current one has been processed.  That is
//! required correctness here, not a convenience; mutating one message must
//! never overlap with fetching another on the same connection.
//!
//! Conceptually the loop walks an explicit state machine,
//! `AwaitingWorkFetch -> AwaitingResultProcessing (per result) ->
//! AwaitingWorkFetch (next unit) -> ... -> Complete`, with `await` points as
//! the suspension edges.

use anyhow::Result;

/// What fetching one work unit produced.
#[derive(Debug)]
pub enum Fetch<R> {
    /// Nothing to process for this unit; advance directly to the next one.
    Skip,
    /// A single result, treated as a one-element result set.
    One(R),
    /// An ordered result set.
    Many(Vec<R>),
}

/// Outcome of processing one result, carrying the processed value.
#[derive(Debug)]
pub enum Step<V> {
    /// Keep going with the remaining results of the current unit.
    Continue(V),
    /// Short-circuit the remaining results of the current unit.  Only honored
    /// when the run was started with `quick_exit`.
    Stop(V),
}

/// The operations [`run_batch`] sequences.
///
/// The driver value doubles as the context forwarded to every callback: state
/// that has to survive across calls (an open connection, counters, the
/// current snapshot) lives in the implementing type.
#[allow(async_fn_in_trait)]
pub trait BatchDriver {
    /// One item of the outer loop.
    type Unit;
    /// One item of the inner, fetched loop.
    type Item;
    /// What processing one item yields.
    type Value;

    /// Fetches the result set of `unit`.
    async fn fetch(&mut self, unit: &Self::Unit) -> Result<Fetch<Self::Item>>;

    /// Processes one fetched item.  Invoked once per item, in result order.
    async fn process(&mut self, unit: &Self::Unit, item: &Self::Item)
        -> Result<Step<Self::Value>>;

    /// Receives the processed value of one item, after [`BatchDriver::process`].
    async fn on_result(
        &mut self,
        unit: &Self::Unit,
        item: &Self::Item,
        value: Self::Value,
    ) -> Result<()>;

    /// Called once a unit's results are drained (normally or via
    /// [`Step::Stop`]).  Not called for units whose fetch returned
    /// [`Fetch::Skip`].
    async fn unit_done(&mut self, unit: &Self::Unit) -> Result<()>;

    /// Called exactly once, after the last unit.  Fires immediately when the
    /// work set is empty.
    async fn on_complete(&mut self) -> Result<()>;
}

/// Drives `driver` over `units`.
///
/// With `quick_exit`, a [`Step::Stop`] from `process` ends the current unit
/// early; without it the signal is ignored and every result is processed.
/// An error from any callback aborts the run before the completion signal.
pub async fn run_batch<D: BatchDriver>(
    driver: &mut D,
    units: &[D::Unit],
    quick_exit: bool,
) -> Result<()> {
    for unit in units {
        let items = match driver.fetch(unit).await? {
            Fetch::Skip => continue,
            Fetch::One(item) => vec![item],
            Fetch::Many(items) => items,
        };

        for item in &items {
            let step = driver.process(unit, item).await?;
            let (value, stop) = match step {
                Step::Continue(value) => (value, false),
                Step::Stop(value) => (value, quick_exit),
            };
            driver.on_result(unit, item, value).await?;
            if stop {
                break;
            }
        }

        driver.unit_done(unit).await?;
    }

    driver.on_complete().await
}
