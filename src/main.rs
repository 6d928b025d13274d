fn main() -> std::process::ExitCode {
    oficina_lib::run()
}
