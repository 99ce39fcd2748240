//! # Query Arguments
//!
//! Plain data describing reads, writes and aggregates. Nothing here talks to
//! a database; kasir-db turns these values into SQL after they validate.
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌────────────────┐   ┌───────────┐
//! │ value.rs      │   │ filter.rs     │   │ args.rs        │   │ update.rs │
//! │ Value         │──►│ Condition     │──►│ FindManyArgs   │   │ Assignment│
//! │ Field trait   │   │ Filter<F>     │   │ OrderBy        │   │ NumberUpd.│
//! │ FieldKind     │   │               │   │ Selection      │   │           │
//! └───────────────┘   └───────────────┘   └────────────────┘   └───────────┘
//!                                              │
//!                                              ▼
//!                                     ┌──────────────────┐
//!                                     │ aggregate.rs     │
//!                                     │ AggregateArgs    │
//!                                     │ GroupByArgs      │
//!                                     │ Having           │
//!                                     └──────────────────┘
//! ```

pub mod aggregate;
pub mod args;
pub mod filter;
pub mod update;
pub mod value;

pub use aggregate::{
    AggregateArgs, AggregateExpr, AggregateFn, AggregateResult, AggregateSelect, CountResult,
    CountSelect, GroupByArgs, GroupByRow, GroupOrderBy, Having,
};
pub use args::{BatchPayload, FindArgs, FindManyArgs, NullsOrder, OrderBy, Selection, SortOrder};
pub use filter::{Condition, Filter};
pub use update::{validate_assignments, Assignment, NumberUpdate, UpdateOp};
pub use value::{format_timestamp, Field, FieldKind, Value};
