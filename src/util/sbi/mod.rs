// SBI封装模块

mod api;

pub use self::api::{console, info, ipi, system, timer, SbiError, SbiResult};
