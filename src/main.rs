fn main() -> std::process::ExitCode {
    blocklaunch::run()
}
