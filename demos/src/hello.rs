use memfs::{Config, Engine, FsError};

pub fn main() -> Result<(), FsError> {
    let config = Config::default().with_storage_bytes(2048);
    let mut fs = Engine::with_config(config)?;

    fs.create_file("hello.txt")?;
    fs.write("hello.txt", b"Hello, block storage!")?;
    fs.create_file("numbers.bin")?;
    let numbers: Vec<u8> = (0..=255).collect();
    fs.write("numbers.bin", &numbers)?;
    fs.create_directory("docs")?;

    let contents = fs.read("hello.txt", 1024)?;
    println!("hello.txt: {}", String::from_utf8_lossy(&contents));

    print!("\n{}", fs.listing());

    let sb = fs.statfs();
    println!(
        "\n{} of {} blocks used, {} of {} inodes used.",
        sb.used_blocks(),
        sb.blocks_count,
        sb.used_inodes(),
        sb.inodes_count
    );

    fs.delete("numbers.bin")?;
    println!("After delete: {} blocks free.", fs.statfs().free_blocks_count);

    fs.destroy();
    Ok(())
}
