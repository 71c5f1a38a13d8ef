// Domain-layer modules and shared errors/models
pub mod aggregator {
    pub use crate::aggregator::*;
}

pub mod fertilizer {
    pub use crate::fertilizer::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod errors {
    pub use crate::errors::*;
}
