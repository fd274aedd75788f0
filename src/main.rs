#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod entry {
    use core::arch::global_asm;

    // 启动入口：设置启动栈，把hartid存入tp，然后进入rust_main
    global_asm!(
        r#"
    .section .text.entry
    .globl _start
_start:
    la sp, boot_stack_top
    mv tp, a0
    call rust_main

    .section .bss.stack
    .globl boot_stack_lower_bound
boot_stack_lower_bound:
    .space {stack_size}
    .globl boot_stack_top
boot_stack_top:
"#,
        stack_size = const nt_trapos::config::STACK_SIZE,
    );

    /// Rust主函数 - 系统的真正入口点
    #[no_mangle]
    extern "C" fn rust_main(hartid: usize) -> ! {
        // 清除BSS段 - 启动栈位于.bss.stack，链接脚本把它放在sbss之前
        unsafe { nt_trapos::clear_bss() };

        // 系统初始化
        nt_trapos::init(hartid);

        // 主循环
        nt_trapos::main_loop();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    println!("nt_trapos is a bare-metal kernel; build it for riscv64gc-unknown-none-elf");
}
