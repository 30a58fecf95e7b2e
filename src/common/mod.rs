pub mod dyn_tensor;
pub mod tensor;
