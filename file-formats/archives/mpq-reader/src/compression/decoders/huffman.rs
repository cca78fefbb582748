//! Adaptive Huffman decoder (WAVE files)
//!
//! The stream starts with a byte selecting the initial weight table. The tree
//! is rebuilt from that table and then adapts as bytes are decoded: value
//! 0x101 introduces a literal byte that is grafted onto the lightest leaf,
//! and table 0 also bumps the weight of every decoded byte.

use super::Decoder;
use crate::{Error, Result};

/// Maximum number of tree nodes, leaves and branches together
const HUFF_ITEM_COUNT: usize = 0x203;

/// Decoded value that ends the stream
const END_OF_STREAM: u16 = 0x100;

/// Decoded value announcing a literal byte in the next 8 bits
const NEW_BRANCH: u16 = 0x101;

/// Index of the list sentinel in the node arena
const HEAD: usize = 0;

const BYTE_TO_WEIGHT_00: [u8; 258] = [
    0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02,
    0x00, 0x00,
];

const BYTE_TO_WEIGHT_01: [u8; 258] = [
    0x54, 0x16, 0x16, 0x0D, 0x0C, 0x08, 0x06, 0x05, 0x06, 0x05, 0x06, 0x03, 0x04, 0x04, 0x03, 0x05,
    0x0E, 0x0B, 0x14, 0x13, 0x13, 0x09, 0x0B, 0x06, 0x05, 0x04, 0x03, 0x02, 0x03, 0x02, 0x02, 0x02,
    0x0D, 0x07, 0x09, 0x06, 0x06, 0x04, 0x03, 0x02, 0x04, 0x03, 0x03, 0x03, 0x03, 0x03, 0x02, 0x02,
    0x09, 0x06, 0x04, 0x04, 0x04, 0x04, 0x03, 0x02, 0x03, 0x02, 0x02, 0x02, 0x02, 0x03, 0x02, 0x04,
    0x08, 0x03, 0x04, 0x07, 0x09, 0x05, 0x03, 0x03, 0x03, 0x03, 0x02, 0x02, 0x02, 0x03, 0x02, 0x02,
    0x03, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x01, 0x01, 0x01, 0x02, 0x01, 0x02, 0x02,
    0x06, 0x0A, 0x08, 0x08, 0x06, 0x07, 0x04, 0x03, 0x04, 0x04, 0x02, 0x02, 0x04, 0x02, 0x03, 0x03,
    0x04, 0x03, 0x07, 0x07, 0x09, 0x06, 0x04, 0x03, 0x03, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02,
    0x0A, 0x02, 0x02, 0x03, 0x02, 0x02, 0x01, 0x01, 0x02, 0x02, 0x02, 0x06, 0x03, 0x05, 0x02, 0x03,
    0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x03, 0x01, 0x01, 0x01,
    0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x04, 0x04, 0x04, 0x07, 0x09, 0x08, 0x0C, 0x02,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x03,
    0x04, 0x01, 0x02, 0x04, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01,
    0x04, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x03, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x01, 0x01, 0x02, 0x02, 0x02, 0x06, 0x4B,
    0x00, 0x00,
];

const BYTE_TO_WEIGHT_02: [u8; 258] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x27, 0x00, 0x00, 0x23, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x01, 0x01, 0x06, 0x0E, 0x10, 0x04,
    0x06, 0x08, 0x05, 0x04, 0x04, 0x03, 0x03, 0x02, 0x02, 0x03, 0x03, 0x01, 0x01, 0x02, 0x01, 0x01,
    0x01, 0x04, 0x02, 0x04, 0x02, 0x02, 0x02, 0x01, 0x01, 0x04, 0x01, 0x01, 0x02, 0x03, 0x03, 0x02,
    0x03, 0x01, 0x03, 0x06, 0x04, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x02, 0x01, 0x01,
    0x01, 0x29, 0x07, 0x16, 0x12, 0x40, 0x0A, 0x0A, 0x11, 0x25, 0x01, 0x03, 0x17, 0x10, 0x26, 0x2A,
    0x10, 0x01, 0x23, 0x23, 0x2F, 0x10, 0x06, 0x07, 0x02, 0x09, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00,
];

/// Initial weight tables, selected by the low nibble of the first byte
const WEIGHT_TABLES: [&[u8; 258]; 3] = [&BYTE_TO_WEIGHT_00, &BYTE_TO_WEIGHT_01, &BYTE_TO_WEIGHT_02];

/// Huffman, method bit 0x01
#[derive(Debug, Clone, Copy, Default)]
pub struct Huffman;

impl Decoder for Huffman {
    fn name(&self) -> &'static str {
        "huffman"
    }

    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = BitReader::new(data);
        let compression_type = reader.get_8_bits()?;
        let mut tree = HuffmanTree::build(compression_type)?;

        // Table 0 starts nearly empty, so it learns from every byte
        let adaptive = compression_type == 0;

        // One byte past the expected size is enough to report a mismatch
        let mut output = Vec::with_capacity(expected_len);
        while output.len() <= expected_len {
            let mut value = tree.decode_one(&mut reader)?;
            if value == END_OF_STREAM {
                break;
            }

            if value == NEW_BRANCH {
                value = u16::from(reader.get_8_bits()?);
                let leaf = tree.insert_branch(value)?;
                if !adaptive {
                    tree.increment(leaf);
                }
            }

            output.push(value as u8);

            if adaptive {
                if let Some(leaf) = tree.by_value[usize::from(value)] {
                    tree.increment(leaf);
                }
            }
        }

        log::trace!(
            "Huffman type {compression_type}: {} bytes in, {} bytes out",
            data.len(),
            output.len()
        );

        Ok(output)
    }
}

/// LSB-first bit reader
struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let byte = self
            .data
            .get(self.position)
            .ok_or_else(|| Error::compression("Unexpected end of Huffman data"))?;
        self.bit_buffer |= u32::from(*byte) << self.bit_count;
        self.position += 1;
        self.bit_count += 8;
        Ok(())
    }

    fn get_bit(&mut self) -> Result<bool> {
        if self.bit_count == 0 {
            self.refill()?;
        }

        let bit = self.bit_buffer & 1;
        self.bit_buffer >>= 1;
        self.bit_count -= 1;
        Ok(bit != 0)
    }

    /// Next 8 bits, not necessarily byte aligned
    fn get_8_bits(&mut self) -> Result<u8> {
        if self.bit_count < 8 {
            self.refill()?;
        }

        let byte = (self.bit_buffer & 0xFF) as u8;
        self.bit_buffer >>= 8;
        self.bit_count -= 8;
        Ok(byte)
    }
}

#[derive(Debug, Clone)]
struct HuffmanItem {
    value: u16,
    weight: u32,
    parent: Option<usize>,
    /// The lower-weight child; its higher-weight sibling is the item just
    /// before it in the weight list
    child_lo: Option<usize>,
    prev: usize,
    next: usize,
}

impl HuffmanItem {
    fn new(value: u16, weight: u32) -> Self {
        Self {
            value,
            weight,
            parent: None,
            child_lo: None,
            prev: HEAD,
            next: HEAD,
        }
    }
}

/// Tree nodes threaded on one circular list, heaviest first.
///
/// Siblings are always adjacent in the list, which is what lets a node keep
/// a single child link.
struct HuffmanTree {
    items: Vec<HuffmanItem>,
    by_value: [Option<usize>; 0x102],
}

impl HuffmanTree {
    fn build(compression_type: u8) -> Result<Self> {
        let weights = WEIGHT_TABLES
            .get(usize::from(compression_type & 0x0F))
            .ok_or_else(|| {
                Error::compression(format!(
                    "Unsupported Huffman weight table {}",
                    compression_type & 0x0F
                ))
            })?;

        let mut tree = Self {
            items: Vec::with_capacity(HUFF_ITEM_COUNT + 1),
            by_value: [None; 0x102],
        };
        tree.items.push(HuffmanItem::new(0, 0));

        let mut max_weight = 0;
        for (byte, &weight) in weights.iter().take(0x100).enumerate() {
            if weight == 0 {
                continue;
            }
            let item = tree.alloc(byte as u16, u32::from(weight))?;
            tree.link_after(HEAD, item);
            tree.by_value[byte] = Some(item);
            max_weight = tree.fixup_position(item, max_weight);
        }

        for value in [END_OF_STREAM, NEW_BRANCH] {
            let item = tree.alloc(value, 1)?;
            tree.link_after(tree.last(), item);
            tree.by_value[usize::from(value)] = Some(item);
        }

        // Pair items from the light end; each new parent is filed by weight
        // and gets paired in turn once the walk reaches it
        let mut child_lo = tree.last();
        while child_lo != HEAD {
            let child_hi = tree.items[child_lo].prev;
            if child_hi == HEAD {
                break;
            }

            let weight = tree.items[child_hi].weight + tree.items[child_lo].weight;
            let parent = tree.alloc(0, weight)?;
            tree.link_after(HEAD, parent);
            tree.items[child_lo].parent = Some(parent);
            tree.items[child_hi].parent = Some(parent);
            tree.items[parent].child_lo = Some(child_lo);
            max_weight = tree.fixup_position(parent, max_weight);

            child_lo = tree.items[child_hi].prev;
        }

        Ok(tree)
    }

    fn first(&self) -> usize {
        self.items[HEAD].next
    }

    fn last(&self) -> usize {
        self.items[HEAD].prev
    }

    fn alloc(&mut self, value: u16, weight: u32) -> Result<usize> {
        if self.items.len() > HUFF_ITEM_COUNT {
            return Err(Error::compression("Huffman tree is full"));
        }
        self.items.push(HuffmanItem::new(value, weight));
        Ok(self.items.len() - 1)
    }

    fn unlink(&mut self, item: usize) {
        let HuffmanItem { prev, next, .. } = self.items[item];
        self.items[prev].next = next;
        self.items[next].prev = prev;
    }

    fn link_after(&mut self, anchor: usize, item: usize) {
        let next = self.items[anchor].next;
        self.items[item].prev = anchor;
        self.items[item].next = next;
        self.items[next].prev = item;
        self.items[anchor].next = item;
    }

    /// Walk towards the heavy end from `item` for the first weight >= `weight`
    fn find_higher_or_equal(&self, mut item: usize, weight: u32) -> usize {
        while item != HEAD {
            if self.items[item].weight >= weight {
                return item;
            }
            item = self.items[item].prev;
        }
        HEAD
    }

    /// Move a freshly inserted front item behind everything at least as heavy
    fn fixup_position(&mut self, item: usize, max_weight: u32) -> u32 {
        let weight = self.items[item].weight;
        if weight < max_weight {
            let higher = self.find_higher_or_equal(self.last(), weight);
            self.unlink(item);
            self.link_after(higher, item);
            max_weight
        } else {
            weight
        }
    }

    fn decode_one(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let mut item = self.first();
        if item == HEAD {
            return Err(Error::compression("Empty Huffman tree"));
        }

        while let Some(child_lo) = self.items[item].child_lo {
            item = if reader.get_bit()? {
                self.items[child_lo].prev
            } else {
                child_lo
            };
        }

        Ok(self.items[item].value)
    }

    /// Split the lightest leaf into itself and a new zero-weight leaf for
    /// `value`. Returns the new leaf.
    fn insert_branch(&mut self, value: u16) -> Result<usize> {
        let last = self.last();
        if last == HEAD || self.items[last].child_lo.is_some() {
            return Err(Error::compression("Corrupt Huffman tree"));
        }

        let old = self.items[last].clone();
        let child_hi = self.alloc(old.value, old.weight)?;
        self.link_after(self.last(), child_hi);
        self.items[child_hi].parent = Some(last);
        self.by_value[usize::from(old.value)] = Some(child_hi);

        let child_lo = self.alloc(value, 0)?;
        self.link_after(self.last(), child_lo);
        self.items[child_lo].parent = Some(last);
        self.items[last].child_lo = Some(child_lo);
        self.by_value[usize::from(value)] = Some(child_lo);

        self.increment(child_lo);
        Ok(child_lo)
    }

    /// Add one to the weight of `item` and its ancestors, swapping each
    /// with the front-most lighter item to keep the list ordered
    fn increment(&mut self, item: usize) {
        let mut current = Some(item);
        while let Some(item) = current {
            self.items[item].weight += 1;
            let weight = self.items[item].weight;

            let higher = self.find_higher_or_equal(self.items[item].prev, weight);
            let other = self.items[higher].next;
            if other != item {
                self.swap(item, other, higher);
            }

            current = self.items[item].parent;
        }
    }

    /// Exchange list positions and parents of `item` and `other`, where
    /// `other` sits earlier in the list, right after `higher`
    fn swap(&mut self, item: usize, other: usize, higher: usize) {
        let (Some(item_parent), Some(other_parent)) =
            (self.items[item].parent, self.items[other].parent)
        else {
            return;
        };

        self.unlink(other);
        self.link_after(item, other);
        self.unlink(item);
        self.link_after(higher, item);

        let item_was_lo = self.items[item_parent].child_lo == Some(item);
        let other_was_lo = self.items[other_parent].child_lo == Some(other);
        if item_was_lo {
            self.items[item_parent].child_lo = Some(other);
        }
        if other_was_lo {
            self.items[other_parent].child_lo = Some(item);
        }

        self.items[item].parent = Some(other_parent);
        self.items[other].parent = Some(item_parent);
    }
}
