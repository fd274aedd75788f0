// SBI API封装
// 只保留陷阱子系统需要的调用：控制台、定时器、处理器间中断、关机

use sbi_rt::legacy;

/// SBI调用返回值类型
pub type SbiResult = Result<usize, SbiError>;

/// SBI错误类型 - 符合SBI规范的错误代码
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SbiError {
    Failed = -1,
    NotSupported = -2,
    InvalidParam = -3,
}

/// 控制台相关的SBI调用封装
pub mod console {
    use super::*;

    /// 输出单个字符到控制台
    pub fn putchar(ch: char) -> SbiResult {
        legacy::console_putchar(ch as usize);
        Ok(0)
    }

    /// 输出字符串到控制台，返回输出的字符数
    pub fn puts(s: &str) -> SbiResult {
        let mut count = 0;
        for ch in s.chars() {
            putchar(ch)?;
            count += 1;
        }
        Ok(count)
    }
}

/// 时间相关的SBI调用封装
pub mod timer {
    use super::*;
    use crate::config::{CLOCK_FREQ, TICKS_PER_SEC};

    /// 设置定时器
    pub fn set_timer(time: u64) -> SbiResult {
        legacy::set_timer(time);
        Ok(0)
    }

    /// 读取当前时间并安排下一次时钟中断。
    /// 重新设置定时器同时清除挂起的 STIP 位，即时钟中断的应答。
    pub fn arm_next_tick() -> SbiResult {
        let now = riscv::register::time::read64();
        set_timer(now + CLOCK_FREQ / TICKS_PER_SEC)
    }
}

/// 处理器间中断(IPI)
pub mod ipi {
    use super::*;

    /// 向掩码中的hart发送软件中断
    ///
    /// # 参数
    /// * `hart_mask` - 目标hart掩码，位n对应hart n
    pub fn send_ipi(hart_mask: usize) -> SbiResult {
        // legacy接口接收掩码所在的地址
        let mask = hart_mask;
        match legacy::send_ipi(&mask as *const usize as usize) {
            0 => Ok(0),
            _ => Err(SbiError::Failed),
        }
    }
}

/// 系统相关的SBI调用封装
pub mod system {
    use super::*;

    /// 关闭系统
    pub fn shutdown() -> ! {
        legacy::shutdown();
    }
}

/// SBI信息查询接口
pub mod info {
    use super::*;

    /// 打印启动信息
    pub fn print_banner(hartid: usize) {
        console::puts("=== NT TrapOS ===\n").ok();
        console::puts("Boot hart: ").ok();
        console::putchar(char::from(b'0' + (hartid % 10) as u8)).ok();
        console::puts("\n").ok();
    }
}
