// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod booking;
pub mod edit;
pub mod fetch;
pub mod field;
pub mod ids;
pub mod list;
pub mod model;
pub mod remote;
pub mod requested;
pub mod submit;
pub mod validation;

pub use booking::*;
pub use edit::*;
pub use fetch::*;
pub use field::*;
pub use ids::*;
pub use list::*;
pub use model::*;
pub use remote::*;
pub use requested::*;
pub use submit::*;
pub use validation::*;
