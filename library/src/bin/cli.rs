use comic_editor_core::LibraryError;
use comic_editor_core::run;

fn main() -> Result<(), LibraryError> {
    env_logger::init();
    run(std::env::args().collect())
}
