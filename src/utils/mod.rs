// Small helpers with no domain state

pub mod natural_sort;

pub use natural_sort::natural_cmp;
