use parking_lot::Mutex;
use sysinfo::System;

/// A source of system wide resource usage.
pub trait ResourceGauge: Send + Sync {
    /// The global CPU usage, as a percentage.
    fn cpu_percent(&self) -> f32;

    /// The used memory, as a percentage of the total.
    fn mem_percent(&self) -> f32;
}

/// Reads the host's resource usage.
///
/// CPU usage is computed between consecutive refreshes, so the first sample after
/// creation is meaningless until some time has passed.
pub struct SystemGauge {
    system: Mutex<System>,
}

impl SystemGauge {
    /// Creates a new `SystemGauge`.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGauge for SystemGauge {
    fn cpu_percent(&self) -> f32 {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.global_cpu_usage()
    }

    fn mem_percent(&self) -> f32 {
        let mut system = self.system.lock();
        system.refresh_memory();

        match system.total_memory() {
            0 => 0.,
            total => (system.used_memory() as f64 / total as f64 * 100.) as f32,
        }
    }
}

/// A gauge whose readings are set by hand.
#[derive(Debug, Default)]
pub struct StaticGauge {
    cpu: Mutex<f32>,
    mem: Mutex<f32>,
}

impl StaticGauge {
    /// Creates a new `StaticGauge`.
    ///
    /// # Arguments
    /// * `cpu` - The initial CPU reading.
    /// * `mem` - The initial memory reading.
    pub fn new(cpu: f32, mem: f32) -> Self {
        Self {
            cpu: Mutex::new(cpu),
            mem: Mutex::new(mem),
        }
    }

    pub fn set_cpu(&self, cpu: f32) {
        *self.cpu.lock() = cpu;
    }

    pub fn set_mem(&self, mem: f32) {
        *self.mem.lock() = mem;
    }
}

impl ResourceGauge for StaticGauge {
    fn cpu_percent(&self) -> f32 {
        *self.cpu.lock()
    }

    fn mem_percent(&self) -> f32 {
        *self.mem.lock()
    }
}
