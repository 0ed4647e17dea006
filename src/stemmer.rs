//! Stemming capability and its implementations.
//!
//! Callers only see the [`Stem`] trait; the concrete algorithm is picked once
//! at configuration time through [`StemmerKind`].

use std::fmt;
use std::str::FromStr;

/// A deterministic, pure word-to-stem function.
pub trait Stem {
    fn stem(&self, word: &str) -> String;
}

/// Which stemmer implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemmerKind {
    /// The affix-stripping French algorithm implemented in this module.
    French,
    /// Pass-through: returns the input unchanged.
    Quick,
    /// The Snowball French algorithm from `rust-stemmers`.
    Snowball,
}

impl StemmerKind {
    pub fn create(self) -> Box<dyn Stem> {
        match self {
            StemmerKind::French => Box::new(French),
            StemmerKind::Quick => Box::new(Quick),
            StemmerKind::Snowball => Box::new(Snowball::new()),
        }
    }
}

impl FromStr for StemmerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "french" => Ok(StemmerKind::French),
            "quick" | "frenchquick" => Ok(StemmerKind::Quick),
            "snowball" => Ok(StemmerKind::Snowball),
            other => Err(format!("unknown stemmer '{other}' (expected french, quick or snowball)")),
        }
    }
}

impl fmt::Display for StemmerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StemmerKind::French => write!(f, "french"),
            StemmerKind::Quick => write!(f, "quick"),
            StemmerKind::Snowball => write!(f, "snowball"),
        }
    }
}

/// Pass-through stemmer.
pub struct Quick;

impl Stem for Quick {
    fn stem(&self, word: &str) -> String {
        word.to_string()
    }
}

/// Snowball French, behind the same trait.
pub struct Snowball {
    inner: rust_stemmers::Stemmer,
}

impl Snowball {
    pub fn new() -> Self {
        Self {
            inner: rust_stemmers::Stemmer::create(rust_stemmers::Algorithm::French),
        }
    }
}

impl Default for Snowball {
    fn default() -> Self {
        Self::new()
    }
}

impl Stem for Snowball {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(word).to_string()
    }
}

const VOWELS: &str = "aeiouyâàëéêèïîôûù";

fn is_vowel(c: char) -> bool {
    VOWELS.contains(c)
}

/// French affix-stripping stemmer.
///
/// The word is lower-cased, semi-consonants are marked by upper-casing them
/// (`jouer` -> `joUer`, `yeux` -> `Yeux`, `quand` -> `qUand`), the RV/R1/R2
/// regions are computed once, and six ordered suffix passes run against those
/// region snapshots. Marked letters are not vowels for any later check.
pub struct French;

impl Stem for French {
    fn stem(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if lower.is_empty() {
            return lower;
        }

        let mut w = Working::new(&lower);
        w.apply_consonance();
        w.compute_regions();

        let mut altered = w.step1_standard_suffixes();
        if !altered {
            altered = w.step2a_verb_suffixes_in_i();
            if !altered {
                altered = w.step2b_other_verb_suffixes();
            }
        }
        if altered {
            altered = w.step3_residual_letters();
        }
        if !altered {
            w.step4_residual_suffixes();
        }
        w.step5_undouble();
        w.step6_unaccent();

        w.stem.iter().collect::<String>().to_lowercase()
    }
}

/// Mutable working state for one word. The regions are snapshots: suffix
/// deletions only touch `stem`.
struct Working {
    stem: Vec<char>,
    rv: Vec<char>,
    r1: Vec<char>,
    r2: Vec<char>,
}

fn ends_with(word: &[char], suffix: &str) -> bool {
    let n = suffix.chars().count();
    word.len() >= n && word[word.len() - n..].iter().copied().eq(suffix.chars())
}

fn contains(word: &[char], pattern: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    if pat.is_empty() {
        return true;
    }
    word.windows(pat.len()).any(|w| w == pat.as_slice())
}

fn first_vowel_pos(word: &[char]) -> usize {
    word.iter()
        .position(|&c| is_vowel(c))
        .unwrap_or_else(|| word.len().saturating_sub(1))
}

fn last_vowel_pos(word: &[char]) -> usize {
    (1..word.len())
        .rev()
        .find(|&i| is_vowel(word[i]))
        .unwrap_or_else(|| word.len().saturating_sub(1))
}

/// R1 is the region after the first non-vowel following a vowel, or the end
/// of the word if there is no such non-vowel. R2 is R1 of R1.
fn region_after_non_vowel(word: &[char]) -> Vec<char> {
    let pos = first_vowel_pos(word);
    let mut res = pos + 1;
    for i in pos + 1..word.len() {
        if !is_vowel(word[i]) {
            res = i + 1;
            break;
        }
    }
    word.get(res..).unwrap_or(&[]).to_vec()
}

impl Working {
    fn new(lower: &str) -> Self {
        Self {
            stem: lower.chars().collect(),
            rv: Vec::new(),
            r1: Vec::new(),
            r2: Vec::new(),
        }
    }

    /// Mark `u`/`i` between vowels (and `u` after `q`) and `y` next to a
    /// vowel by upper-casing them, in place so that an already-marked letter
    /// no longer counts as a vowel for the letters after it.
    fn apply_consonance(&mut self) {
        let len = self.stem.len();
        for i in 0..len {
            match self.stem[i] {
                'u' if i > 0 && self.stem[i - 1] == 'q' => self.stem[i] = 'U',
                c @ ('u' | 'i') => {
                    if i > 0
                        && i + 1 < len
                        && is_vowel(self.stem[i - 1])
                        && is_vowel(self.stem[i + 1])
                    {
                        self.stem[i] = c.to_ascii_uppercase();
                    }
                }
                'y' => {
                    if (i > 0 && is_vowel(self.stem[i - 1]))
                        || (i + 1 < len && is_vowel(self.stem[i + 1]))
                    {
                        self.stem[i] = 'Y';
                    }
                }
                _ => {}
            }
        }
    }

    /// RV: the region after the first vowel not at the start of the word;
    /// after the third letter when the word begins with two vowels; the
    /// region right of a `par`/`col`/`tap` prefix.
    fn compute_regions(&mut self) {
        let len = self.stem.len();

        self.rv = 'rv: {
            if len >= 3 {
                let prefix: String = self.stem[..3].iter().collect();
                if prefix == "par" || prefix == "col" || prefix == "tap" {
                    break 'rv self.stem[3..].to_vec();
                }
                if is_vowel(self.stem[0]) && is_vowel(self.stem[1]) {
                    break 'rv self.stem[2..].to_vec();
                }
            }
            let first = first_vowel_pos(&self.stem);
            let last = last_vowel_pos(&self.stem);
            for i in first + 1..len {
                if is_vowel(self.stem[i]) && i != last {
                    break 'rv self.stem[i + 1..].to_vec();
                }
            }
            self.stem.clone()
        };

        self.r1 = region_after_non_vowel(&self.stem);
        self.r2 = region_after_non_vowel(&self.r1);
    }

    /// Position of `suffix` when the stem ends with it.
    fn suffix_pos(&self, suffix: &str) -> Option<usize> {
        if ends_with(&self.stem, suffix) {
            Some(self.stem.len() - suffix.chars().count())
        } else {
            None
        }
    }

    fn is_suffix(&self, suffix: &str) -> bool {
        ends_with(&self.stem, suffix)
    }

    fn is_suffix_in_rv(&self, suffix: &str) -> bool {
        ends_with(&self.rv, suffix)
    }

    fn in_r1(&self, suffix: &str) -> bool {
        contains(&self.r1, suffix)
    }

    fn in_r2(&self, suffix: &str) -> bool {
        contains(&self.r2, suffix)
    }

    fn in_rv(&self, suffix: &str) -> bool {
        contains(&self.rv, suffix)
    }

    fn equals(&self, suffix: &str) -> bool {
        self.stem.iter().copied().eq(suffix.chars())
    }

    fn replace_suffix_with(&mut self, suffix: &str, with: &str) -> bool {
        if let Some(pos) = self.suffix_pos(suffix) {
            self.stem.truncate(pos);
            self.stem.extend(with.chars());
            true
        } else {
            false
        }
    }

    /// Delete the suffix when it lies in the region and the whole stem is
    /// not just the suffix (never reduce a word to empty).
    fn delete_if_in_r1(&mut self, suffix: &str) -> bool {
        match self.suffix_pos(suffix) {
            Some(pos) if self.in_r1(suffix) && !self.equals(suffix) => {
                self.stem.truncate(pos);
                true
            }
            _ => false,
        }
    }

    fn delete_if_in_r2(&mut self, suffix: &str) -> bool {
        match self.suffix_pos(suffix) {
            Some(pos) if self.in_r2(suffix) && !self.equals(suffix) => {
                self.stem.truncate(pos);
                true
            }
            _ => false,
        }
    }

    fn delete_if_in_rv(&mut self, suffix: &str) -> bool {
        match self.suffix_pos(suffix) {
            Some(pos) if self.in_rv(suffix) && !self.equals(suffix) => {
                self.stem.truncate(pos);
                true
            }
            _ => false,
        }
    }

    /// The char just before `suffix` would start, in `region`, when the
    /// region is long enough to hold both.
    fn char_before_in(region: &[char], suffix: &str) -> Option<char> {
        let n = suffix.chars().count();
        if region.len() > n {
            Some(region[region.len() - 1 - n])
        } else {
            None
        }
    }

    /// Standard noun/adjective suffix removal.
    fn step1_standard_suffixes(&mut self) -> bool {
        // Whether an adverb suffix was present at all; reported when no
        // table below fires.
        let res = self.is_suffix("amment")
            || self.is_suffix("emment")
            || self.is_suffix("ments")
            || self.is_suffix("ment");

        // Just delete if in R2.
        for suf in [
            "ances", "ance", "ismes", "isme", "ables", "able", "iqUes", "iqUe", "istes", "iste",
            "eux",
        ] {
            if self.delete_if_in_r2(suf) {
                return true;
            }
        }

        // Delete if in R2; a preceding "ic" is deleted too when in R2,
        // otherwise replaced by "iqU".
        for suf in ["atrices", "atrice", "ateurs", "ateur", "ations", "ation"] {
            if self.delete_if_in_r2(suf) {
                let len = self.stem.len();
                if len > 2 && self.stem[len - 2] == 'i' && self.stem[len - 1] == 'c' {
                    self.stem.truncate(len - 2);
                    if !self.in_r2(&format!("ic{suf}")) {
                        self.stem.extend("iqU".chars());
                    }
                }
                return true;
            }
        }

        for suf in ["logies", "logie"] {
            if self.in_rv(suf) && self.replace_suffix_with(suf, "log") {
                return true;
            }
        }
        for suf in ["usions", "usion", "utions", "ution"] {
            if self.in_r2(suf) && self.replace_suffix_with(suf, "u") {
                return true;
            }
        }
        for suf in ["ences", "ence"] {
            if self.in_r2(suf) && self.replace_suffix_with(suf, "ent") {
                return true;
            }
        }

        // Delete if in R1 and preceded by a non-vowel.
        for suf in ["issements", "issement"] {
            if let Some(prev) = Self::char_before_in(&self.stem, suf) {
                if !is_vowel(prev) && self.delete_if_in_r1(suf) {
                    return true;
                }
            }
        }

        // ement family: delete if in RV, then try the residues it exposes.
        for suf in ["ements", "ement"] {
            self.delete_if_in_rv(suf);
            if (self.is_suffix("ativ") && self.delete_if_in_r2("ativ"))
                || (self.is_suffix("iv") && self.delete_if_in_r2("iv"))
            {
                return true;
            }
            if self.is_suffix("eus") {
                if self.delete_if_in_r2("eus") {
                    return true;
                }
                if self.in_r1("eus") && self.replace_suffix_with("eus", "eux") {
                    return true;
                }
            }
            if (self.is_suffix("abl") && self.delete_if_in_r2("abl"))
                || (self.is_suffix("iqU") && self.delete_if_in_r2("iqU"))
            {
                return true;
            }
            if self.in_rv("ièr") && self.replace_suffix_with("ièr", "i") {
                return true;
            }
            if self.in_rv("Ièr") && self.replace_suffix_with("Ièr", "i") {
                return true;
            }
        }

        // ité family with abil/ic/iv residues.
        for suf in ["ités", "ité"] {
            let deleted = self.delete_if_in_r2(suf);
            if self.is_suffix("abil") {
                if self.delete_if_in_r2("abil") {
                    return true;
                }
                if self.replace_suffix_with("abil", "abl") {
                    return true;
                }
            }
            if self.is_suffix("ic") {
                if self.delete_if_in_r2("ic") {
                    return true;
                }
                if self.replace_suffix_with("ic", "iqU") {
                    return true;
                }
            }
            if self.is_suffix("iv") && self.delete_if_in_r2("iv") {
                return true;
            }
            if deleted {
                return true;
            }
        }

        // if/ive family with an at/ic residue.
        for suf in ["ives", "ifs", "ive", "if"] {
            self.delete_if_in_r2(suf);
            if self.is_suffix("at") {
                self.delete_if_in_r2("at");
                if self.is_suffix("ic") {
                    if self.delete_if_in_r2("ic") {
                        return true;
                    }
                    self.replace_suffix_with("ic", "iqU");
                }
                return true;
            }
        }

        if self.is_suffix("eaux") {
            return self.replace_suffix_with("eaux", "eau");
        }
        if self.is_suffix("aux") && self.in_r1("aux") && self.replace_suffix_with("aux", "al") {
            return true;
        }

        for suf in ["euses", "euse"] {
            if self.delete_if_in_r2(suf) {
                return true;
            }
            if self.in_r1(suf) {
                self.replace_suffix_with(suf, "eux");
                return true;
            }
        }

        if self.rv.iter().collect::<String>() == "amment"
            && self.replace_suffix_with("amment", "ant")
        {
            return true;
        }
        if self.in_rv("amment") && self.replace_suffix_with("amment", "") {
            return true;
        }
        if self.in_rv("emment") && self.replace_suffix_with("emment", "ent") {
            return true;
        }

        // ment(s) preceded by a vowel in RV.
        for suf in ["ments", "ment"] {
            if let Some(prev) = Self::char_before_in(&self.rv, suf) {
                if self.is_suffix_in_rv(suf) && is_vowel(prev) {
                    if let Some(pos) = self.suffix_pos(suf) {
                        self.stem.truncate(pos);
                    }
                    return true;
                }
            }
        }

        res
    }

    /// Verb suffixes beginning with `i`, deleted when preceded by a
    /// non-vowel in RV. Longest first.
    fn step2a_verb_suffixes_in_i(&mut self) -> bool {
        const SUFFIXES: &[&str] = &[
            "issaIent", "issantes", "issions", "issante", "issants", "iraIent", "issons",
            "irions", "issiez", "issant", "issent", "issais", "issait", "irais", "isses",
            "issez", "irent", "irons", "iront", "iriez", "irait", "isse", "îmes", "îtes",
            "irai", "iras", "irez", "ies", "ira", "it", "is", "ie", "ir", "ît", "i",
        ];
        for &suf in SUFFIXES {
            if let Some(prev) = Self::char_before_in(&self.rv, suf) {
                if !is_vowel(prev) && self.delete_if_in_rv(suf) {
                    return true;
                }
            }
        }
        false
    }

    /// Remaining verb suffixes.
    fn step2b_other_verb_suffixes(&mut self) -> bool {
        if self.delete_if_in_r2("ions") {
            return true;
        }

        for suf in [
            "eraIent", "erions", "erais", "erait", "eriez", "erons", "eront", "èrent", "eras",
            "erai", "erez", "iez", "ées", "era", "és", "ez", "ée", "er", "é",
        ] {
            if self.is_suffix(suf) && self.delete_if_in_rv(suf) {
                return true;
            }
        }

        // a-family; a preceding `e` in RV goes with it.
        for suf in [
            "assions", "assent", "assiez", "antes", "asses", "aIent", "âtes", "ante", "ants",
            "asse", "âmes", "ais", "ait", "ant", "ât", "as", "ai", "a",
        ] {
            if self.is_suffix(suf) && self.delete_if_in_rv(suf) {
                if let Some('e') = Self::char_before_in(&self.rv, suf) {
                    self.stem.pop();
                }
                return true;
            }
        }

        false
    }

    /// Final marked `Y` becomes `i`, final `ç` becomes `c`.
    fn step3_residual_letters(&mut self) -> bool {
        if let Some(c) = self.stem.last_mut() {
            if *c == 'Y' {
                *c = 'i';
                return true;
            }
            if *c == 'ç' {
                *c = 'c';
                return true;
            }
        }
        false
    }

    /// Residual suffixes, tried against the RV snapshot.
    fn step4_residual_suffixes(&mut self) {
        if self.stem.is_empty() {
            return;
        }

        // Trailing s not preceded by a, i, o, u, è or s.
        let len = self.stem.len();
        if len >= 2 && self.stem[len - 1] == 's' {
            let prev = self.stem[len - 2];
            if !matches!(prev, 'a' | 'i' | 'o' | 'u' | 'è' | 's') {
                self.stem.truncate(len - 1);
            }
        }

        // ion preceded by s or t, deleted in R2.
        if self.rv.len() > 4 {
            let pos = self.rv.len() - 4;
            if pos != 0
                && self.is_suffix_in_rv("ion")
                && matches!(self.rv[pos], 's' | 't')
            {
                self.delete_if_in_r2("ion");
            }
        }

        for suf in ["Ière", "ière", "Ier", "ier"] {
            if self.is_suffix_in_rv(suf) {
                self.replace_suffix_with(suf, "i");
            }
        }

        if self.is_suffix("e") {
            self.stem.pop();
        }

        if self.is_suffix_in_rv("guë") {
            self.stem.pop();
        }
    }

    /// Undouble a final consonant after enn, onn, ett, ell or eill.
    fn step5_undouble(&mut self) {
        for suf in ["enn", "onn", "ett", "ell", "eill"] {
            if self.is_suffix(suf) {
                self.stem.pop();
                return;
            }
        }
    }

    /// Un-accent `é`/`è` right before a final non-vowel.
    fn step6_unaccent(&mut self) {
        let len = self.stem.len();
        if len < 2 {
            return;
        }
        if matches!(self.stem[len - 2], 'é' | 'è') && !is_vowel(self.stem[len - 1]) {
            self.stem[len - 2] = 'e';
        }
    }
}
