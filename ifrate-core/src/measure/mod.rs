mod capacity;
mod percent;

pub use self::{
    capacity::LinkCapacity,
    percent::{Percent, PercentError, PercentParseError},
};
