use std::{hint::black_box, println, time::Instant};

use slotvec::{CloneRelocate, SlotVec};

fn main() {
    const SIZE: usize = 1 << 24;
    let size = black_box(SIZE);

    let start = Instant::now();
    let mut vec: SlotVec<usize> = SlotVec::new();
    for i in 0..size {
        black_box(vec.push(i));
    }
    let end = Instant::now();
    println!("slotvec push took {:?}", (end - start));

    let start = Instant::now();
    let mut vec: SlotVec<usize, CloneRelocate> = SlotVec::new();
    for i in 0..size {
        black_box(vec.push(i));
    }
    let end = Instant::now();
    println!("slotvec push (cloning relocation) took {:?}", (end - start));

    let start = Instant::now();
    let mut vec = Vec::new();
    for i in 0..size {
        vec.push(i);
        black_box(vec.last());
    }
    let end = Instant::now();
    println!("std push took {:?}", (end - start));
}
