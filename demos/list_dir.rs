use fs_prims::{DirIter, basename, cwd, is_directory};

fn main() {
    // list the directory given on the command line, or the current one
    let dir = std::env::args().nth(1).unwrap_or_else(cwd);
    if dir.is_empty() {
        eprintln!("unable to determine the current directory");
        std::process::exit(1);
    }
    if !is_directory(&dir) {
        eprintln!("{dir} is not a directory");
        std::process::exit(1);
    }

    println!("{dir}:");

    // cursor style: advance until the iterator equals the end sentinel
    let end = DirIter::end();
    let mut it = DirIter::new(&dir);
    while it != end {
        if let Some(path) = it.path() {
            let name = basename(&path.to_string_lossy());
            let marker = if is_directory(&path) { "/" } else { "" };
            println!("  {name}{marker}");
        }
        it.advance();
    }

    // iterator style
    let count = DirIter::new(&dir).count();
    println!("{count} entries");
}
