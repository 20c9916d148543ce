pub use self::value::Value;
mod value;

pub use self::array::Array;
mod array;
