// nt_trapos/src/lib.rs

#![cfg_attr(not(test), no_std)]

// 导入alloc crate以支持动态数据结构
extern crate alloc;

// 声明内核模块
pub mod config;
pub mod console;
pub mod test;
pub mod trap;
pub mod util;

// 裸机内核：堆、panic处理与启动流程
#[cfg(all(target_arch = "riscv64", not(test)))]
mod kernel;

#[cfg(all(target_arch = "riscv64", not(test)))]
pub use kernel::{clear_bss, init, main_loop, shutdown};
