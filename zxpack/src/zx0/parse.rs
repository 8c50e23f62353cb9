//! Optimal parse for the ZX0 format
//!
//! ZX0 keeps a "last offset" register, so the parse tracks, per offset, the
//! cheapest encoding that ends in a literal run and the cheapest that ends
//! in a copy from that offset. Candidate blocks form chains back to the
//! start of the input; reference counting recycles blocks as soon as no
//! surviving chain can reach them, which bounds memory to the offset window
//! instead of the whole candidate graph.

/// The offset register starts at one, so a copy can appear immediately
pub(super) const INITIAL_OFFSET: usize = 1;
/// Largest offset the standard offset encoding can express
pub const MAX_OFFSET: usize = 32640;
/// Offset window used in quick mode; trades ratio for parse speed
pub const QUICK_MAX_OFFSET: usize = 2176;

/// Null block index
pub(super) const NONE: u32 = u32::MAX;

/// One candidate encoding step; `offset == 0` marks a literal run
///
/// `bits` and `index` are signed because the chain is seeded with a
/// sentinel block one position before the input.
pub(super) struct Block {
    pub bits: i32,
    pub index: i32,
    pub offset: u32,
    pub length: u32,
    pub chain: u32,
    references: u32,
    ghost: u32,
}

/// Block storage with a free list of unreferenced ("ghost") blocks
pub(super) struct Arena {
    blocks: Vec<Block>,
    ghost_root: u32,
}

impl Arena {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            ghost_root: NONE,
        }
    }

    pub(super) fn block(&self, id: u32) -> &Block {
        &self.blocks[id as usize]
    }

    /// Reuse a ghost block if one exists, releasing its chain link lazily
    fn allocate(&mut self, bits: i32, index: i32, offset: u32, length: u32, chain: u32) -> u32 {
        let id = match self.ghost_root {
            NONE => {
                self.blocks.push(Block {
                    bits,
                    index,
                    offset,
                    length,
                    chain: NONE,
                    references: 0,
                    ghost: NONE,
                });
                self.blocks.len() as u32 - 1
            }
            id => {
                self.ghost_root = self.blocks[id as usize].ghost;
                let old_chain = self.blocks[id as usize].chain;
                if old_chain != NONE {
                    self.release(old_chain);
                }
                let block = &mut self.blocks[id as usize];
                block.bits = bits;
                block.index = index;
                block.offset = offset;
                block.length = length;
                block.references = 0;
                id
            }
        };
        self.blocks[id as usize].chain = chain;
        if chain != NONE {
            self.blocks[chain as usize].references += 1;
        }
        id
    }

    /// Point `slot` at `id`, ghosting whatever it referenced before
    fn assign(&mut self, slot: &mut u32, id: u32) {
        self.blocks[id as usize].references += 1;
        let old = *slot;
        if old != NONE {
            self.release(old);
        }
        *slot = id;
    }

    fn release(&mut self, id: u32) {
        let block = &mut self.blocks[id as usize];
        block.references -= 1;
        if block.references == 0 {
            block.ghost = self.ghost_root;
            self.ghost_root = id;
        }
    }

    #[cfg(test)]
    fn live_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// Bits taken by the interlaced Elias gamma code of `value`
pub(super) fn elias_gamma_bits(value: i32) -> i32 {
    let mut bits = 1;
    let mut ceiling = 2;
    while ceiling <= value {
        bits += 2;
        ceiling <<= 1;
    }
    bits
}

fn offset_ceiling(index: i32, offset_limit: usize) -> usize {
    let limit = offset_limit as i32;
    if index > limit {
        offset_limit
    } else if index < INITIAL_OFFSET as i32 {
        INITIAL_OFFSET
    } else {
        index as usize
    }
}

/// Compute the cheapest parse; returns the arena and the final block
pub(super) fn optimize(input: &[u8], offset_limit: usize) -> (Arena, u32) {
    let size = input.len();
    let window = offset_ceiling(size as i32 - 1, offset_limit);

    let mut last_literal = vec![NONE; window + 1];
    let mut last_match = vec![NONE; window + 1];
    let mut optimal = vec![NONE; size];
    let mut match_length = vec![0i32; window + 1];
    let mut best_length = vec![0usize; (size + 1).max(3)];
    best_length[2] = 2;

    let mut arena = Arena::new();

    // Sentinel: pretend a copy from the initial offset ended just before the
    // input, so the first real block can chain onto something.
    let sentinel = arena.allocate(-1, -1, INITIAL_OFFSET as u32, 0, NONE);
    arena.assign(&mut last_match[INITIAL_OFFSET], sentinel);

    for index in 0..size {
        let mut best_length_size = 2;
        let max_offset = offset_ceiling(index as i32, offset_limit);
        for offset in 1..=max_offset {
            if index > 0 && index >= offset && input[index] == input[index - offset] {
                // Copy from the last offset, extending the literal run that
                // this offset's chain ended with.
                if last_literal[offset] != NONE {
                    let from = last_literal[offset];
                    let length = index as i32 - arena.block(from).index;
                    let bits = arena.block(from).bits + 1 + elias_gamma_bits(length);
                    let id =
                        arena.allocate(bits, index as i32, offset as u32, length as u32, from);
                    arena.assign(&mut last_match[offset], id);
                    if optimal[index] == NONE || arena.block(optimal[index]).bits > bits {
                        arena.assign(&mut optimal[index], last_match[offset]);
                    }
                }
                // Copy from a new offset once at least two bytes match.
                match_length[offset] += 1;
                if match_length[offset] > 1 {
                    if best_length_size < match_length[offset] as usize {
                        let mut bits = arena
                            .block(optimal[index - best_length[best_length_size]])
                            .bits
                            + elias_gamma_bits(best_length[best_length_size] as i32 - 1);
                        loop {
                            best_length_size += 1;
                            let bits2 = arena.block(optimal[index - best_length_size]).bits
                                + elias_gamma_bits(best_length_size as i32 - 1);
                            if bits2 <= bits {
                                best_length[best_length_size] = best_length_size;
                                bits = bits2;
                            } else {
                                best_length[best_length_size] =
                                    best_length[best_length_size - 1];
                            }
                            if best_length_size >= match_length[offset] as usize {
                                break;
                            }
                        }
                    }
                    let length = best_length[match_length[offset] as usize];
                    let bits = arena.block(optimal[index - length]).bits
                        + 8
                        + elias_gamma_bits((offset as i32 - 1) / 128 + 1)
                        + elias_gamma_bits(length as i32 - 1);
                    let current = last_match[offset];
                    if current == NONE
                        || arena.block(current).index != index as i32
                        || arena.block(current).bits > bits
                    {
                        let id = arena.allocate(
                            bits,
                            index as i32,
                            offset as u32,
                            length as u32,
                            optimal[index - length],
                        );
                        arena.assign(&mut last_match[offset], id);
                        if optimal[index] == NONE || arena.block(optimal[index]).bits > bits {
                            arena.assign(&mut optimal[index], last_match[offset]);
                        }
                    }
                }
            } else {
                match_length[offset] = 0;
                // Literal run following the last copy from this offset.
                if last_match[offset] != NONE {
                    let from = last_match[offset];
                    let length = index as i32 - arena.block(from).index;
                    let bits =
                        arena.block(from).bits + 1 + elias_gamma_bits(length) + length * 8;
                    let id = arena.allocate(bits, index as i32, 0, length as u32, from);
                    arena.assign(&mut last_literal[offset], id);
                    if optimal[index] == NONE || arena.block(optimal[index]).bits > bits {
                        arena.assign(&mut optimal[index], last_literal[offset]);
                    }
                }
            }
        }
    }

    let last = optimal[size - 1];
    (arena, last)
}
