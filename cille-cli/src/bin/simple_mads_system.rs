use cille_core::engine::SimCtrl;
use cille_core::firmware::MultiplierTest;
use cille_core::harness::{SimpleSystem, SystemConfig};
use cille_core::isa::Rv32b;
use cille_core::resources::multiplier::MultiplierConfig;
use log::info;
use stderrlog::LogLevelNum;

/// Cycles the multiplier takes per product on this system.
const MULTIPLIER_LATENCY: u32 = 2;

fn main() {
    stderrlog::new()
        .verbosity(LogLevelNum::Info)
        .modules([module_path!(), "cille_core"])
        .init()
        .unwrap();

    let mut config = SystemConfig::new("simple_mads_system");
    config.core.rv32b = Rv32b::Full;
    config.multiplier = MultiplierConfig {
        latency: MULTIPLIER_LATENCY,
    };
    info!("Multiplier latency: {MULTIPLIER_LATENCY} cycles");

    let mut system = SimpleSystem::new(config, Box::new(MultiplierTest::new()));
    let code = system.main(&mut SimCtrl::new(), std::env::args_os());
    std::process::exit(code);
}
