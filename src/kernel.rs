// nt_trapos/src/kernel.rs
// 裸机内核：堆、panic处理、启动期协作者与主循环

use crate::config::{AllocatorMode, KernelConfig, KERNEL_HEAP_SIZE, PAGE_SIZE, UART0_IRQ};
use crate::trap::infrastructure::low_level::{self, hart_id, Plic, RiscvHardware};
use crate::trap::{
    self, DeviceDriver, Frame, FrameAllocator, HeapErrorManager, MapError, PageMapper,
    PageTableHandle, Process, ProcessRegistry, PteFlags, Scheduler, SyscallLayer, TrapContext,
    TrapDeps, TrapMode,
};
use crate::util::sbi;
use crate::{debug_print, error_print, info_print, warn_print};
use alloc::alloc::{alloc, dealloc, Layout};
use alloc::sync::Arc;
use core::arch::asm;
use core::panic::PanicInfo;
use linked_list_allocator::LockedHeap;

// 设置全局分配器
#[global_allocator]
static HEAP: LockedHeap = LockedHeap::empty();

static mut HEAP_SPACE: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];

/// 编译期指定的启动参数，例如 `page_allocator=lazy`
const BOOTARGS: &str = match option_env!("NT_TRAPOS_BOOTARGS") {
    Some(args) => args,
    None => "",
};

/// Panic处理器 - 当发生panic时调用
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    // 禁用中断，防止嵌套Panic
    low_level::disable_interrupts();

    error_print!("KERNEL PANIC!");

    if let Some(location) = info.location() {
        error_print!("  Location: {}:{}", location.file(), location.line());
    }
    error_print!("  Message: {}", info.message());

    // 陷阱系统已初始化时进入panic模式
    trap::infrastructure::di::with_trap_system(|ts| {
        let errors = ts.error_manager();
        if !errors.is_panic_mode() {
            errors.enter_panic_mode();
        }
    });

    error_print!("System halted.");
    // 停下所有hart，而不只是当前这个
    low_level::halt_all_harts()
}

/// 清空BSS段
///
/// # Safety
/// 只能在启动早期、任何静态变量被使用之前调用一次
pub unsafe fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    for addr in sbss as usize..ebss as usize {
        core::ptr::write_volatile(addr as *mut u8, 0);
    }
}

/// 从内核堆中分配整页的帧分配器
struct HeapFrameAllocator;

impl HeapFrameAllocator {
    fn layout() -> Option<Layout> {
        Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).ok()
    }
}

// SAFETY: 每个帧都是一次独立的按页对齐分配，归还前不会再分配给他人
unsafe impl FrameAllocator for HeapFrameAllocator {
    fn allocate_frame(&self) -> Option<Frame> {
        let layout = Self::layout()?;
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { Frame::from_kernel_addr(ptr as usize) })
    }

    fn free_frame(&self, frame: Frame) {
        if let Some(layout) = Self::layout() {
            unsafe { dealloc(frame.kernel_addr() as *mut u8, layout) };
        }
    }
}

/// 启动阶段还没有用户地址空间，任何映射请求都被拒绝
struct NoUserSpace;

impl PageMapper for NoUserSpace {
    fn map(&self, _: PageTableHandle, va: usize, _: &Frame, _: PteFlags) -> Result<(), MapError> {
        warn_print!("no user address space to map va {:#x}", va);
        Err(MapError::InvalidAddress)
    }
}

/// 空闲调度器：只有启动核上的空闲循环
struct IdleScheduler;

impl Scheduler for IdleScheduler {
    fn yield_now(&self, _cpu: usize, _proc: &Process) {}

    fn exit(&self, cpu: usize, proc: &Process) {
        warn_print!("cpu{}: pid {} {} exited", cpu, proc.pid(), proc.name());
    }

    fn wakeup(&self, _key: usize) {}
}

/// 当前核由tp给出；启动阶段没有进程
struct HartRegistry;

impl ProcessRegistry for HartRegistry {
    fn current_cpu(&self) -> usize {
        hart_id()
    }

    fn current_process(&self) -> Option<Arc<Process>> {
        None
    }
}

/// 只记录中断的设备驱动
struct LoggedDevice(&'static str);

impl DeviceDriver for LoggedDevice {
    fn handle_interrupt(&self) {
        debug_print!("{} interrupt", self.0);
    }
}

/// 16550 串口：读空接收FIFO并回显
struct Uart;

impl Uart {
    const BASE: usize = 0x1000_0000;
    const RBR: usize = 0;
    const IER: usize = 1;
    const LSR: usize = 5;
    const LSR_DATA_READY: u8 = 1;

    fn reg(offset: usize) -> *mut u8 {
        (Self::BASE + offset) as *mut u8
    }

    /// 打开接收中断
    fn enable_rx_interrupt(&self) {
        unsafe { Self::reg(Self::IER).write_volatile(1) };
    }
}

impl DeviceDriver for Uart {
    fn handle_interrupt(&self) {
        while unsafe { Self::reg(Self::LSR).read_volatile() } & Self::LSR_DATA_READY != 0 {
            let byte = unsafe { Self::reg(Self::RBR).read_volatile() };
            let _ = sbi::console::putchar(byte as char);
        }
    }
}

/// 系统调用层尚未接入，所有调用返回-1
struct NoSyscalls;

impl SyscallLayer for NoSyscalls {
    fn dispatch(&self, proc: &Process, tf: &mut TrapContext) {
        warn_print!("pid {} {}: unknown syscall {}", proc.pid(), proc.name(), tf.syscall_number());
        tf.set_return_value(usize::MAX);
    }
}

/// 系统初始化
pub fn init(hartid: usize) {
    sbi::info::print_banner(hartid);
    info_print!("NT TrapOS Initializing...");

    // 1. 初始化内核堆
    unsafe {
        let start = core::ptr::addr_of_mut!(HEAP_SPACE) as *mut u8;
        HEAP.lock().init(start, KERNEL_HEAP_SIZE);
    }
    info_print!("Kernel heap initialized ({} KB).", KERNEL_HEAP_SIZE / 1024);

    // 2. 初始化 Trap 子系统 (依赖堆)
    let config = Arc::new(KernelConfig::from_bootargs(BOOTARGS));
    let uart = Arc::new(Uart);
    uart.enable_rx_interrupt();
    let deps = TrapDeps {
        config: config.clone(),
        frame_allocator: Arc::new(HeapFrameAllocator),
        mapper: Arc::new(NoUserSpace),
        scheduler: Arc::new(IdleScheduler),
        registry: Arc::new(HartRegistry),
        disk: Arc::new(LoggedDevice("virtio-blk")),
        keyboard: Arc::new(LoggedDevice("virtio-input")),
        serial: uart,
        syscalls: Arc::new(NoSyscalls),
        interrupt_controller: Arc::new(Plic),
        error_manager: Arc::new(HeapErrorManager::new()),
        hardware: Arc::new(RiscvHardware),
    };
    if let Err(e) = trap::init(deps, TrapMode::Direct) {
        panic!("trap init failed: {}", e);
    }
    info_print!("Trap Subsystem initialized.");

    // 3. 外部中断
    Plic.init();
    Plic.init_hart(hartid);
    low_level::enable_interrupt_sources();
    debug_print!("PLIC lines enabled, uart line {}", UART0_IRQ);

    match config.allocator_mode() {
        AllocatorMode::Lazy => info_print!("Page allocator: lazy"),
        AllocatorMode::Default => info_print!("Page allocator: default"),
    }
    info_print!("System Core Initialization Completed.");
}

/// 主循环 - 系统的核心循环
pub fn main_loop() -> ! {
    info_print!("Running trap self-test suites...");
    crate::test::run_all_tests();

    if let Err(e) = sbi::timer::arm_next_tick() {
        error_print!("failed to arm timer: {:?}", e);
    }
    trap::enable_interrupts();

    info_print!("System ready. Entering idle loop.");
    let mut reported = 0;
    loop {
        unsafe { asm!("wfi") };
        if low_level::is_halted() {
            low_level::park();
        }
        let ticks = trap::ticks();
        if ticks >= reported + 100 {
            reported = ticks;
            debug_print!("uptime: {} ticks", ticks);
        }
    }
}

/// 系统关闭
pub fn shutdown() -> ! {
    info_print!("System Shutting Down...");
    trap::disable_interrupts();
    for fault in trap::recent_faults() {
        warn_print!("{}", fault);
    }
    sbi::system::shutdown();
}
