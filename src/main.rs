fn main() -> std::process::ExitCode {
    tinkercraft_lib::run()
}
