use std::fs;

use tempfile::TempDir;
use uacc::uio::{self, page_size};
use uacc::{AccessError, SysPaths, Uio, UioMap};

fn add_uio(paths: &SysPaths, index: u32, name: &str, maps: &[(u64, usize)]) {
    let dir = paths.class_dir("uio", &format!("uio{}", index));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
    for (i, (addr, size)) in maps.iter().enumerate() {
        let m = dir.join("maps").join(format!("map{}", i));
        fs::create_dir_all(&m).unwrap();
        fs::write(m.join("addr"), format!("0x{:016x}\n", addr)).unwrap();
        fs::write(m.join("size"), format!("0x{:08x}\n", size)).unwrap();
    }

    fs::create_dir_all(&paths.dev_dir).unwrap();
    let node = fs::File::create(paths.dev_node(&format!("uio{}", index))).unwrap();
    node.set_len((maps.len().max(1) * page_size()) as u64).unwrap();
}

fn fake_sys() -> (TempDir, SysPaths) {
    let root = tempfile::tempdir().unwrap();
    let paths = SysPaths::new(root.path().join("class"), root.path().join("dev"));
    (root, paths)
}

#[test]
fn lists_devices_and_maps() {
    let (_root, paths) = fake_sys();
    add_uio(&paths, 1, "axi_dma", &[(0xa000_0000, 0x1000), (0xa001_0000, 0x800)]);
    add_uio(&paths, 0, "gpio", &[(0x4120_0000, 0x1000)]);

    let devs = uio::list_uio(&paths).unwrap();
    assert_eq!(devs.len(), 2);
    assert_eq!(devs[0].index, 0);
    assert_eq!(devs[0].name, "gpio");
    assert_eq!(devs[1].name, "axi_dma");
    assert_eq!(
        devs[1].maps,
        vec![
            UioMap {
                index: 0,
                addr: 0xa000_0000,
                size: 0x1000
            },
            UioMap {
                index: 1,
                addr: 0xa001_0000,
                size: 0x800
            },
        ]
    );

    assert_eq!(uio::find_uio(&paths, "axi_dma").unwrap(), Some(1));
    assert_eq!(uio::find_uio(&paths, "axi").unwrap(), None);
}

#[test]
fn no_uio_class_means_no_devices() {
    let (_root, paths) = fake_sys();
    assert!(uio::list_uio(&paths).unwrap().is_empty());
    assert_eq!(uio::find_uio(&paths, "gpio").unwrap(), None);
}

#[test]
fn open_by_name_maps_first_region() {
    let (_root, paths) = fake_sys();
    add_uio(&paths, 2, "regs", &[(0x8000_0000, 0x1000)]);

    let dev = Uio::<u32>::open_by_name(&paths, "regs").unwrap();
    assert_eq!(dev.index(), 2);
    assert_eq!(dev.size(), 0x1000);
    dev.write_reg(4, 0xcafe_f00d).unwrap();
    assert_eq!(dev.read_mem(16).unwrap(), 0xcafe_f00d);

    assert!(matches!(
        Uio::<u32>::open_by_name(&paths, "other"),
        Err(AccessError::NotFound { .. })
    ));
}

#[test]
fn second_map_sits_one_page_in() {
    let (_root, paths) = fake_sys();
    add_uio(&paths, 0, "dual", &[(0x1000, 0x100), (0x2000, 0x100)]);

    let map1 = Uio::<u8>::open_map(&paths, 0, 1, 0x100).unwrap();
    map1.write_mem(0, 0x5a).unwrap();
    map1.region().flush().unwrap();

    let raw = fs::read(paths.dev_node("uio0")).unwrap();
    assert_eq!(raw[page_size()], 0x5a);
    assert_eq!(raw[0], 0);
}

#[test]
fn irq_words_go_through_the_node() {
    let (_root, paths) = fake_sys();
    add_uio(&paths, 0, "irq", &[(0x1000, 0x1000)]);
    let node = paths.dev_node("uio0");

    let mut contents = fs::read(&node).unwrap();
    contents[..4].copy_from_slice(&7u32.to_ne_bytes());
    fs::write(&node, &contents).unwrap();

    let dev = Uio::<u32>::open(&paths, 0, 0x1000).unwrap();
    assert_eq!(dev.wait_irq().unwrap(), 7);

    let dev = Uio::<u32>::open(&paths, 0, 0x1000).unwrap();
    dev.set_irq_enable(true).unwrap();
    let raw = fs::read(&node).unwrap();
    assert_eq!(&raw[..4], &1u32.to_ne_bytes());
}
