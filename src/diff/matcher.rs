//! Longest-matching-block sequence matcher over line tokens.
//!
//! Matching blocks are found by recursively anchoring on the longest common
//! run of lines, then the gaps between anchors become replace/delete/insert
//! opcodes. In sequences of 200 lines or more, lines that occur in more than
//! 1% (+1) of the positions of `b` are too common to anchor on and are only
//! absorbed by extending neighbouring matches.

use std::collections::HashMap;

const AUTOJUNK_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// Transforms `a[a_start..a_end]` into `b[b_start..b_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

impl OpCode {
    const fn new(tag: OpTag, a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> Self {
        Self {
            tag,
            a_start,
            a_end,
            b_start,
            b_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Match {
    a: usize,
    b: usize,
    size: usize,
}

pub struct SequenceMatcher<'a> {
    a: &'a [&'a str],
    b: &'a [&'a str],
    b2j: HashMap<&'a str, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    #[must_use]
    pub fn new(a: &'a [&'a str], b: &'a [&'a str]) -> Self {
        let mut b2j: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (j, &line) in b.iter().enumerate() {
            b2j.entry(line).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let popular_threshold = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= popular_threshold);
        }

        Self { a, b, b2j }
    }

    fn find_longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> Match {
        let (mut best_a, mut best_b, mut best_size) = (a_lo, b_lo, 0usize);

        // j2len[j] = length of the match ending at a[i - 1] and b[j].
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in a_lo..a_hi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_a = i + 1 - k;
                        best_b = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular lines never seed a match, but equal neighbours still extend one.
        while best_a > a_lo && best_b > b_lo && self.a[best_a - 1] == self.b[best_b - 1] {
            best_a -= 1;
            best_b -= 1;
            best_size += 1;
        }
        while best_a + best_size < a_hi
            && best_b + best_size < b_hi
            && self.a[best_a + best_size] == self.b[best_b + best_size]
        {
            best_size += 1;
        }

        Match {
            a: best_a,
            b: best_b,
            size: best_size,
        }
    }

    fn matching_blocks(&self) -> Vec<Match> {
        let (len_a, len_b) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, len_a, 0, len_b)];
        let mut blocks = Vec::new();

        while let Some((a_lo, a_hi, b_lo, b_hi)) = queue.pop() {
            let found = self.find_longest_match(a_lo, a_hi, b_lo, b_hi);
            if found.size == 0 {
                continue;
            }
            blocks.push(found);
            if a_lo < found.a && b_lo < found.b {
                queue.push((a_lo, found.a, b_lo, found.b));
            }
            if found.a + found.size < a_hi && found.b + found.size < b_hi {
                queue.push((found.a + found.size, a_hi, found.b + found.size, b_hi));
            }
        }
        blocks.sort_unstable();

        let mut collapsed = Vec::with_capacity(blocks.len() + 1);
        let mut current = Match {
            a: 0,
            b: 0,
            size: 0,
        };
        for block in blocks {
            if current.a + current.size == block.a && current.b + current.size == block.b {
                current.size += block.size;
            } else {
                if current.size > 0 {
                    collapsed.push(current);
                }
                current = block;
            }
        }
        if current.size > 0 {
            collapsed.push(current);
        }
        collapsed.push(Match {
            a: len_a,
            b: len_b,
            size: 0,
        });
        collapsed
    }

    /// Opcodes covering both sequences end to end, in order.
    #[must_use]
    pub fn opcodes(&self) -> Vec<OpCode> {
        let (mut i, mut j) = (0, 0);
        let mut codes = Vec::new();

        for block in self.matching_blocks() {
            let tag = match (i < block.a, j < block.b) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                codes.push(OpCode::new(tag, i, block.a, j, block.b));
            }
            i = block.a + block.size;
            j = block.b + block.size;
            if block.size > 0 {
                codes.push(OpCode::new(OpTag::Equal, block.a, i, block.b, j));
            }
        }
        codes
    }

    /// Opcodes split into hunks with at most `context` unchanged lines on
    /// either side of each change. Changes separated by more than
    /// `2 * context` unchanged lines land in different hunks.
    #[must_use]
    pub fn grouped_opcodes(&self, context: usize) -> Vec<Vec<OpCode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(OpCode::new(OpTag::Equal, 0, 1, 0, 1));
        }

        if let Some(first) = codes.first_mut()
            && first.tag == OpTag::Equal
        {
            first.a_start = first.a_start.max(first.a_end.saturating_sub(context));
            first.b_start = first.b_start.max(first.b_end.saturating_sub(context));
        }
        if let Some(last) = codes.last_mut()
            && last.tag == OpTag::Equal
        {
            last.a_end = last.a_end.min(last.a_start.saturating_add(context));
            last.b_end = last.b_end.min(last.b_start.saturating_add(context));
        }

        let split_at = context.saturating_mul(2);
        let mut groups = Vec::new();
        let mut group = Vec::new();
        for mut code in codes {
            if code.tag == OpTag::Equal && code.a_end - code.a_start > split_at {
                group.push(OpCode::new(
                    OpTag::Equal,
                    code.a_start,
                    code.a_end.min(code.a_start.saturating_add(context)),
                    code.b_start,
                    code.b_end.min(code.b_start.saturating_add(context)),
                ));
                groups.push(std::mem::take(&mut group));
                code.a_start = code.a_start.max(code.a_end.saturating_sub(context));
                code.b_start = code.b_start.max(code.b_end.saturating_sub(context));
            }
            group.push(code);
        }
        if !(group.is_empty() || (group.len() == 1 && group[0].tag == OpTag::Equal)) {
            groups.push(group);
        }
        groups
    }
}
