// 平台工具模块

#[cfg(target_arch = "riscv64")]
pub mod sbi;
