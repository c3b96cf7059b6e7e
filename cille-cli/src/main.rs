use cille_core::engine::SimCtrl;
use cille_core::firmware::MultiplierTest;
use cille_core::harness::{SimpleSystem, SystemConfig};
use cille_core::isa::Rv32b;
use stderrlog::LogLevelNum;

fn main() {
    stderrlog::new()
        .verbosity(LogLevelNum::Info)
        .modules([module_path!(), "cille_core"])
        .init()
        .unwrap();

    let mut config = SystemConfig::new("cille_demo_system");
    config.core.rv32b = Rv32b::None;

    let mut system = SimpleSystem::new(config, Box::new(MultiplierTest::new()));
    let code = system.main(&mut SimCtrl::new(), std::env::args_os());
    std::process::exit(code);
}
