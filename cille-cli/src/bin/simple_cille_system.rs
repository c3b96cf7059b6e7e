use cille_core::engine::SimCtrl;
use cille_core::firmware::CounterTest;
use cille_core::harness::{SimpleSystem, SystemConfig};
use cille_core::isa::Rv32b;
use stderrlog::LogLevelNum;

fn main() {
    stderrlog::new()
        .verbosity(LogLevelNum::Info)
        .modules([module_path!(), "cille_core"])
        .init()
        .unwrap();

    let mut config = SystemConfig::new("simple_cille_system");
    config.core.rv32b = Rv32b::Balanced;

    let mut system = SimpleSystem::new(config, Box::new(CounterTest::new()));
    let code = system.main(&mut SimCtrl::new(), std::env::args_os());
    std::process::exit(code);
}
