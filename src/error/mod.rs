#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Out of capacity: {required} slots are required, but only {capacity} are available")]
    OutOfCapacity { required: usize, capacity: usize },

    #[error("Out of range: {name}[{index}] exceeds the length {length}")]
    OutOfRange {
        name: &'static str,
        index: usize,
        length: usize,
    },

    #[error("Unsupported SH degree: {0} (It should be no more than 3)")]
    UnsupportedShDegree(u32),

    #[error("Unsupported SH encoding: {0:?} (It should be \"float\", \"half\" or \"byte\")")]
    UnsupportedShEncoding(String),

    #[error("Validation Error: {0} should be {1}")]
    Validation(String, String),
}
