//! Bare-metal test programs for the simple systems.

mod counter_test;

pub use counter_test::CounterTest;
pub use multiplier_test::MultiplierTest;
