// nt_trapos/src/trap/infrastructure/di/container.rs

//! # Trap System Dependency Injection Container
//!
//! Defines the `TrapSystem` struct: the trap dispatcher together with the
//! collaborators injected into it. One trap number comes in per call; the
//! dispatcher classifies it through the vector table, runs the matching
//! handler, and then applies the uniform kill and preemption checks.

use super::traits::{
    DeviceDriver, ErrorManager, FrameAllocator, HardwareController, InterruptController,
    PageMapper, ProcessRegistry, Scheduler, SyscallLayer,
};
use crate::config::{AllocatorMode, KernelConfig, IRQ_TIMER, TIMER_OWNER_CPU, T_GPFLT, T_IRQ0};
use crate::trap::ds::{
    self, codes, DeviceKind, ErrorCode, ErrorLevel, ErrorSource, GateKind, HandlerKind,
    ProcState, Process, SystemError, TrapContext,
};
use crate::trap::infrastructure::fault_resolver::{DeclineReason, FaultOutcome, LazyFaultResolver};
use crate::trap::tick::TickClock;
use crate::trap::vector::VectorTable;
use crate::{error_print, warn_print};
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

/// Everything the dispatcher needs from the rest of the kernel.
pub struct TrapDeps {
    pub config: Arc<KernelConfig>,
    pub frame_allocator: Arc<dyn FrameAllocator>,
    pub mapper: Arc<dyn PageMapper>,
    pub scheduler: Arc<dyn Scheduler>,
    pub registry: Arc<dyn ProcessRegistry>,
    pub disk: Arc<dyn DeviceDriver>,
    pub keyboard: Arc<dyn DeviceDriver>,
    pub serial: Arc<dyn DeviceDriver>,
    pub syscalls: Arc<dyn SyscallLayer>,
    pub interrupt_controller: Arc<dyn InterruptController>,
    pub error_manager: Arc<dyn ErrorManager>,
    pub hardware: Arc<dyn HardwareController>,
}

pub struct TrapSystem {
    vectors: VectorTable,
    clock: TickClock,
    resolver: LazyFaultResolver,
    config: Arc<KernelConfig>,
    scheduler: Arc<dyn Scheduler>,
    registry: Arc<dyn ProcessRegistry>,
    disk: Arc<dyn DeviceDriver>,
    keyboard: Arc<dyn DeviceDriver>,
    serial: Arc<dyn DeviceDriver>,
    syscalls: Arc<dyn SyscallLayer>,
    interrupt_controller: Arc<dyn InterruptController>,
    error_manager: Arc<dyn ErrorManager>,
    hardware_controller: Arc<dyn HardwareController>,
}

impl TrapSystem {
    /// Creates a new `TrapSystem` by injecting its dependencies. The vector
    /// table is built here, pointing every gate at the hardware entry stub.
    pub fn new(deps: TrapDeps) -> Self {
        Self {
            vectors: VectorTable::new(deps.hardware.trap_entry()),
            clock: TickClock::new(),
            resolver: LazyFaultResolver::new(deps.frame_allocator, deps.mapper),
            config: deps.config,
            scheduler: deps.scheduler,
            registry: deps.registry,
            disk: deps.disk,
            keyboard: deps.keyboard,
            serial: deps.serial,
            syscalls: deps.syscalls,
            interrupt_controller: deps.interrupt_controller,
            error_manager: deps.error_manager,
            hardware_controller: deps.hardware,
        }
    }

    /// Loads the trap vector on the calling hart.
    pub fn initialize(&self, mode: ds::TrapMode) {
        self.hardware_controller.init_trap_vector(mode);
    }

    /// Entry from the low-level bridge: looks up the current hart and process
    /// and dispatches.
    pub fn dispatch_current(&self, tf: &mut TrapContext) {
        let cpu = self.registry.current_cpu();
        let proc = self.registry.current_process();
        self.handle_trap(cpu, proc.as_deref(), tf);
    }

    /// The trap dispatcher.
    ///
    /// `proc` is the process running on `cpu` when the trap arrived, if any.
    /// `tf` is the saved state; it is written back to the hart on return.
    pub fn handle_trap(&self, cpu: usize, proc: Option<&Process>, tf: &mut TrapContext) {
        tf.trapno = self.checked_vector(tf);
        let trapno = tf.trapno;

        let handled = match self.vectors.kind(trapno) {
            HandlerKind::SystemCall => match proc {
                Some(p) => {
                    self.system_call(cpu, p, tf);
                    return;
                }
                None => false,
            },
            HandlerKind::PageFault => match proc {
                Some(p) if self.page_fault(p, tf) => return,
                _ => false,
            },
            HandlerKind::Timer => {
                if cpu == TIMER_OWNER_CPU {
                    self.clock.tick(&*self.scheduler);
                }
                self.interrupt_controller.end_of_interrupt(cpu, trapno);
                true
            }
            HandlerKind::Device(device) => {
                self.driver(device).handle_interrupt();
                self.interrupt_controller.end_of_interrupt(cpu, trapno);
                true
            }
            HandlerKind::SecondaryDisk => {
                self.interrupt_controller.end_of_interrupt(cpu, trapno);
                true
            }
            HandlerKind::Spurious => {
                self.spurious(cpu, tf);
                true
            }
            HandlerKind::Exception => false,
        };

        if !handled {
            self.unexpected(cpu, proc, tf);
        }

        let Some(p) = proc else { return };
        if self.exit_if_killed(cpu, p, tf) {
            return;
        }
        if p.state() == ProcState::Running && trapno == T_IRQ0 + IRQ_TIMER {
            self.scheduler.yield_now(cpu, p);
        }
        // The process may have been killed while it was off the hart.
        self.exit_if_killed(cpu, p, tf);
    }

    /// Vector actually serviced. A trap raised by instruction through a gate
    /// whose privilege the caller lacks is a protection fault.
    fn checked_vector(&self, tf: &TrapContext) -> usize {
        match self.vectors.gate(tf.trapno) {
            Some(gate) if tf.is_software_raised() && !gate.permits(tf.privilege()) => T_GPFLT,
            _ => tf.trapno,
        }
    }

    fn system_call(&self, cpu: usize, proc: &Process, tf: &mut TrapContext) {
        if proc.is_killed() {
            self.journal(
                ErrorSource::Syscall,
                ErrorLevel::Warning,
                codes::KILLED_AT_SYSCALL,
                format!("pid {} {}: syscall after kill", proc.pid(), proc.name()),
                None,
                tf.sepc,
            );
            self.scheduler.exit(cpu, proc);
            return;
        }

        if tf.is_software_raised() {
            tf.advance_sepc();
        }
        if self.vectors.gate(tf.trapno).is_some_and(|g| g.gate == GateKind::Trap) {
            self.hardware_controller.enable_interrupts();
        }

        self.syscalls.dispatch(proc, tf);

        if proc.is_killed() {
            self.scheduler.exit(cpu, proc);
        }
    }

    /// Returns `true` when the fault was resolved and the faulting
    /// instruction can simply be retried.
    fn page_fault(&self, proc: &Process, tf: &TrapContext) -> bool {
        let va = tf.fault_addr();
        let reason = match self.resolver.resolve(proc, va, self.config.allocator_mode()) {
            FaultOutcome::Resolved { .. } => return true,
            FaultOutcome::Declined(reason) => reason,
        };

        let (number, message) = match reason {
            DeclineReason::LazyDisabled => {
                (codes::LAZY_DISABLED, format!("unhandled page fault for va:{:#x}", va))
            }
            DeclineReason::OutOfBounds | DeclineReason::GuardPage => {
                (codes::UNHANDLED_PAGE_FAULT, String::from("unhandled page fault"))
            }
            DeclineReason::OutOfFrames => {
                (codes::FRAME_EXHAUSTED, String::from("allocating pages failed"))
            }
            DeclineReason::MapFailed(_) => {
                (codes::MAP_FAILED, String::from("allocating pages failed"))
            }
        };
        warn_print!("pid {} {}: {} ({})", proc.pid(), proc.name(), message, reason);
        self.journal(ErrorSource::Memory, ErrorLevel::Warning, number, message, Some(va), tf.sepc);
        false
    }

    fn driver(&self, device: DeviceKind) -> &dyn DeviceDriver {
        match device {
            DeviceKind::Disk => &*self.disk,
            DeviceKind::Keyboard => &*self.keyboard,
            DeviceKind::Serial => &*self.serial,
        }
    }

    fn spurious(&self, cpu: usize, tf: &TrapContext) {
        let message = format!(
            "cpu{}: spurious interrupt at {:?}:{:#x}",
            cpu,
            tf.privilege(),
            tf.sepc
        );
        warn_print!("{}", message);
        self.journal(
            ErrorSource::Device,
            ErrorLevel::Warning,
            codes::SPURIOUS_INTERRUPT,
            message,
            None,
            tf.sepc,
        );
        self.interrupt_controller.end_of_interrupt(cpu, tf.trapno);
    }

    /// Default case. Kernel-side traps halt the machine; user-side traps
    /// mark the process killed for the exit check that follows.
    fn unexpected(&self, cpu: usize, proc: Option<&Process>, tf: &TrapContext) {
        match proc {
            Some(p) if tf.from_user() => {
                let message = format!(
                    "pid {} {}: trap {} err {} on cpu {} sepc {:#x} addr {:#x}--kill proc",
                    p.pid(),
                    p.name(),
                    tf.trapno,
                    tf.error_code(),
                    cpu,
                    tf.sepc,
                    tf.fault_addr()
                );
                error_print!("{}", message);
                self.journal(
                    ErrorSource::Process,
                    ErrorLevel::Critical,
                    codes::USER_TRAP,
                    message,
                    Some(tf.fault_addr()),
                    tf.sepc,
                );
                p.kill();
            }
            _ => {
                let message = format!(
                    "unexpected trap {} from cpu {} sepc {:#x} (stval={:#x})",
                    tf.trapno,
                    cpu,
                    tf.sepc,
                    tf.fault_addr()
                );
                error_print!("{}", message);
                self.journal(
                    ErrorSource::Trap,
                    ErrorLevel::Fatal,
                    codes::UNEXPECTED_TRAP,
                    message.clone(),
                    Some(tf.fault_addr()),
                    tf.sepc,
                );
                panic!("trap: {}", message);
            }
        }
    }

    fn exit_if_killed(&self, cpu: usize, proc: &Process, tf: &TrapContext) -> bool {
        let exiting = proc.is_killed() && tf.from_user();
        if exiting {
            self.scheduler.exit(cpu, proc);
        }
        exiting
    }

    fn journal(
        &self,
        source: ErrorSource,
        level: ErrorLevel,
        number: u16,
        message: String,
        address: Option<usize>,
        ip: usize,
    ) {
        self.error_manager.record(SystemError::new(
            ErrorCode::new(source, level, number),
            message,
            address,
            ip,
            self.clock.ticks(),
        ));
    }

    pub fn vectors(&self) -> &VectorTable {
        &self.vectors
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn allocator_mode(&self) -> AllocatorMode {
        self.config.allocator_mode()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Provides access to the `ErrorManager`.
    pub fn error_manager(&self) -> Arc<dyn ErrorManager> {
        Arc::clone(&self.error_manager)
    }

    /// Provides access to the `HardwareController`.
    pub fn hardware_controller(&self) -> &dyn HardwareController {
        &*self.hardware_controller
    }
}
