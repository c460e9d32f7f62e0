//! Identifier alphabet tables.
//!
//! The lexer accepts identifiers that start with an ASCII letter or `_` and
//! continue with ASCII letters, digits, `_`, or any scalar inside the frozen
//! range tables below (Hiragana, Katakana, Han, and a curated emoji set).
//! The tables are data, not policy: they are inclusive `[lo, hi]` ranges and
//! are never recomputed from Unicode categories at runtime.

/// Returns true for a character that may begin an identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true for a character that may continue an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || in_ranges(c, HIRAGANA)
        || in_ranges(c, KATAKANA)
        || in_ranges(c, HAN)
        || in_ranges(c, EMOJI)
}

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
}

const HIRAGANA: &[(char, char)] = &[('\u{3041}', '\u{3096}'), ('\u{3099}', '\u{309F}')];

const KATAKANA: &[(char, char)] = &[('\u{30A0}', '\u{30FF}'), ('\u{31F0}', '\u{31FF}')];

const HAN: &[(char, char)] = &[
    ('\u{3400}', '\u{4DBF}'),
    ('\u{4E00}', '\u{9FFF}'),
    ('\u{F900}', '\u{FAFF}'),
    ('\u{20000}', '\u{2A6DF}'),
];

/// Curated emoji ranges (inclusive). Frozen; kept in code-point order.
const EMOJI: &[(char, char)] = &[
    ('\u{0023}', '\u{0023}'),
    ('\u{0030}', '\u{0039}'),
    ('\u{00A9}', '\u{00A9}'),
    ('\u{00AE}', '\u{00AE}'),
    ('\u{203C}', '\u{203C}'),
    ('\u{2049}', '\u{2049}'),
    ('\u{2122}', '\u{2122}'),
    ('\u{2139}', '\u{2139}'),
    ('\u{2194}', '\u{2199}'),
    ('\u{21A9}', '\u{21AA}'),
    ('\u{231A}', '\u{231B}'),
    ('\u{2328}', '\u{2328}'),
    ('\u{23CF}', '\u{23CF}'),
    ('\u{23E9}', '\u{23F3}'),
    ('\u{23F8}', '\u{23FA}'),
    ('\u{24C2}', '\u{24C2}'),
    ('\u{25AA}', '\u{25AB}'),
    ('\u{25B6}', '\u{25B6}'),
    ('\u{25C0}', '\u{25C0}'),
    ('\u{25FB}', '\u{25FE}'),
    ('\u{2600}', '\u{2604}'),
    ('\u{260E}', '\u{260E}'),
    ('\u{2611}', '\u{2611}'),
    ('\u{2614}', '\u{2615}'),
    ('\u{2618}', '\u{2618}'),
    ('\u{261D}', '\u{261D}'),
    ('\u{2620}', '\u{2620}'),
    ('\u{2622}', '\u{2623}'),
    ('\u{2626}', '\u{2626}'),
    ('\u{262A}', '\u{262A}'),
    ('\u{262E}', '\u{262F}'),
    ('\u{2638}', '\u{263A}'),
    ('\u{2640}', '\u{2640}'),
    ('\u{2642}', '\u{2642}'),
    ('\u{2648}', '\u{2653}'),
    ('\u{2660}', '\u{2660}'),
    ('\u{2663}', '\u{2663}'),
    ('\u{2665}', '\u{2666}'),
    ('\u{2668}', '\u{2668}'),
    ('\u{267B}', '\u{267B}'),
    ('\u{267F}', '\u{267F}'),
    ('\u{2692}', '\u{2697}'),
    ('\u{2699}', '\u{2699}'),
    ('\u{269B}', '\u{269C}'),
    ('\u{26A0}', '\u{26A1}'),
    ('\u{26AA}', '\u{26AB}'),
    ('\u{26B0}', '\u{26B1}'),
    ('\u{26BD}', '\u{26BE}'),
    ('\u{26C4}', '\u{26C5}'),
    ('\u{26C8}', '\u{26C8}'),
    ('\u{26CE}', '\u{26CE}'),
    ('\u{26CF}', '\u{26CF}'),
    ('\u{26D1}', '\u{26D1}'),
    ('\u{26D3}', '\u{26D4}'),
    ('\u{26E9}', '\u{26EA}'),
    ('\u{26F0}', '\u{26F5}'),
    ('\u{26F7}', '\u{26FA}'),
    ('\u{26FD}', '\u{26FD}'),
    ('\u{2702}', '\u{2702}'),
    ('\u{2705}', '\u{2705}'),
    ('\u{2708}', '\u{2709}'),
    ('\u{270A}', '\u{270B}'),
    ('\u{270C}', '\u{270D}'),
    ('\u{270F}', '\u{270F}'),
    ('\u{2712}', '\u{2712}'),
    ('\u{2714}', '\u{2714}'),
    ('\u{2716}', '\u{2716}'),
    ('\u{271D}', '\u{271D}'),
    ('\u{2721}', '\u{2721}'),
    ('\u{2728}', '\u{2728}'),
    ('\u{2733}', '\u{2734}'),
    ('\u{2744}', '\u{2744}'),
    ('\u{2747}', '\u{2747}'),
    ('\u{274C}', '\u{274C}'),
    ('\u{274E}', '\u{274E}'),
    ('\u{2753}', '\u{2755}'),
    ('\u{2757}', '\u{2757}'),
    ('\u{2763}', '\u{2764}'),
    ('\u{2795}', '\u{2797}'),
    ('\u{27A1}', '\u{27A1}'),
    ('\u{27B0}', '\u{27B0}'),
    ('\u{27BF}', '\u{27BF}'),
    ('\u{2934}', '\u{2935}'),
    ('\u{2B05}', '\u{2B07}'),
    ('\u{2B1B}', '\u{2B1C}'),
    ('\u{2B50}', '\u{2B50}'),
    ('\u{2B55}', '\u{2B55}'),
    ('\u{3030}', '\u{3030}'),
    ('\u{303D}', '\u{303D}'),
    ('\u{3297}', '\u{3297}'),
    ('\u{3299}', '\u{3299}'),
    ('\u{1F004}', '\u{1F004}'),
    ('\u{1F0CF}', '\u{1F0CF}'),
    ('\u{1F170}', '\u{1F171}'),
    ('\u{1F17E}', '\u{1F17E}'),
    ('\u{1F17F}', '\u{1F17F}'),
    ('\u{1F18E}', '\u{1F18E}'),
    ('\u{1F191}', '\u{1F19A}'),
    ('\u{1F1E6}', '\u{1F1FF}'),
    ('\u{1F201}', '\u{1F202}'),
    ('\u{1F21A}', '\u{1F21A}'),
    ('\u{1F22F}', '\u{1F22F}'),
    ('\u{1F232}', '\u{1F23A}'),
    ('\u{1F250}', '\u{1F251}'),
    ('\u{1F300}', '\u{1F320}'),
    ('\u{1F321}', '\u{1F321}'),
    ('\u{1F324}', '\u{1F32C}'),
    ('\u{1F32D}', '\u{1F32F}'),
    ('\u{1F330}', '\u{1F335}'),
    ('\u{1F336}', '\u{1F336}'),
    ('\u{1F337}', '\u{1F37C}'),
    ('\u{1F37D}', '\u{1F37D}'),
    ('\u{1F37E}', '\u{1F37F}'),
    ('\u{1F380}', '\u{1F393}'),
    ('\u{1F396}', '\u{1F397}'),
    ('\u{1F399}', '\u{1F39B}'),
    ('\u{1F39E}', '\u{1F39F}'),
    ('\u{1F3A0}', '\u{1F3C4}'),
    ('\u{1F3C5}', '\u{1F3C5}'),
    ('\u{1F3C6}', '\u{1F3CA}'),
    ('\u{1F3CB}', '\u{1F3CE}'),
    ('\u{1F3CF}', '\u{1F3D3}'),
    ('\u{1F3D4}', '\u{1F3DF}'),
    ('\u{1F3E0}', '\u{1F3F0}'),
    ('\u{1F3F3}', '\u{1F3F5}'),
    ('\u{1F3F7}', '\u{1F3F7}'),
    ('\u{1F3F8}', '\u{1F3FF}'),
    ('\u{1F400}', '\u{1F43E}'),
    ('\u{1F43F}', '\u{1F43F}'),
    ('\u{1F440}', '\u{1F440}'),
    ('\u{1F441}', '\u{1F441}'),
    ('\u{1F442}', '\u{1F4F7}'),
    ('\u{1F4F8}', '\u{1F4F8}'),
    ('\u{1F4F9}', '\u{1F4FC}'),
    ('\u{1F4FD}', '\u{1F4FD}'),
    ('\u{1F4FF}', '\u{1F4FF}'),
    ('\u{1F500}', '\u{1F53D}'),
    ('\u{1F549}', '\u{1F54A}'),
    ('\u{1F54B}', '\u{1F54E}'),
    ('\u{1F550}', '\u{1F567}'),
    ('\u{1F56F}', '\u{1F570}'),
    ('\u{1F573}', '\u{1F579}'),
    ('\u{1F57A}', '\u{1F57A}'),
    ('\u{1F587}', '\u{1F587}'),
    ('\u{1F58A}', '\u{1F58D}'),
    ('\u{1F590}', '\u{1F590}'),
    ('\u{1F595}', '\u{1F596}'),
    ('\u{1F5A4}', '\u{1F5A4}'),
    ('\u{1F5A5}', '\u{1F5A5}'),
    ('\u{1F5A8}', '\u{1F5A8}'),
    ('\u{1F5B1}', '\u{1F5B2}'),
    ('\u{1F5BC}', '\u{1F5BC}'),
    ('\u{1F5C2}', '\u{1F5C4}'),
    ('\u{1F5D1}', '\u{1F5D3}'),
    ('\u{1F5DC}', '\u{1F5DE}'),
    ('\u{1F5E1}', '\u{1F5E1}'),
    ('\u{1F5E3}', '\u{1F5E3}'),
    ('\u{1F5E8}', '\u{1F5E8}'),
    ('\u{1F5EF}', '\u{1F5EF}'),
    ('\u{1F5F3}', '\u{1F5F3}'),
    ('\u{1F5FA}', '\u{1F5FA}'),
    ('\u{1F5FB}', '\u{1F5FF}'),
    ('\u{1F600}', '\u{1F600}'),
    ('\u{1F601}', '\u{1F610}'),
    ('\u{1F611}', '\u{1F611}'),
    ('\u{1F612}', '\u{1F614}'),
    ('\u{1F615}', '\u{1F615}'),
    ('\u{1F616}', '\u{1F616}'),
    ('\u{1F617}', '\u{1F617}'),
    ('\u{1F618}', '\u{1F618}'),
    ('\u{1F619}', '\u{1F619}'),
    ('\u{1F61A}', '\u{1F61A}'),
    ('\u{1F61B}', '\u{1F61B}'),
    ('\u{1F61C}', '\u{1F61E}'),
    ('\u{1F61F}', '\u{1F61F}'),
    ('\u{1F620}', '\u{1F625}'),
    ('\u{1F626}', '\u{1F627}'),
    ('\u{1F628}', '\u{1F62B}'),
    ('\u{1F62C}', '\u{1F62C}'),
    ('\u{1F62D}', '\u{1F62D}'),
    ('\u{1F62E}', '\u{1F62F}'),
    ('\u{1F630}', '\u{1F633}'),
    ('\u{1F634}', '\u{1F634}'),
    ('\u{1F635}', '\u{1F640}'),
    ('\u{1F641}', '\u{1F642}'),
    ('\u{1F643}', '\u{1F644}'),
    ('\u{1F645}', '\u{1F64F}'),
    ('\u{1F680}', '\u{1F6C5}'),
    ('\u{1F6CB}', '\u{1F6CF}'),
    ('\u{1F6D0}', '\u{1F6D0}'),
    ('\u{1F6D1}', '\u{1F6D2}'),
    ('\u{1F6E0}', '\u{1F6E5}'),
    ('\u{1F6E9}', '\u{1F6E9}'),
    ('\u{1F6EB}', '\u{1F6EC}'),
    ('\u{1F6F0}', '\u{1F6F0}'),
    ('\u{1F6F3}', '\u{1F6F3}'),
    ('\u{1F6F4}', '\u{1F6F6}'),
    ('\u{1F6F7}', '\u{1F6F8}'),
    ('\u{1F910}', '\u{1F918}'),
    ('\u{1F919}', '\u{1F91E}'),
    ('\u{1F91F}', '\u{1F91F}'),
    ('\u{1F920}', '\u{1F927}'),
    ('\u{1F928}', '\u{1F92F}'),
    ('\u{1F930}', '\u{1F930}'),
    ('\u{1F931}', '\u{1F932}'),
    ('\u{1F933}', '\u{1F93A}'),
    ('\u{1F93C}', '\u{1F93E}'),
    ('\u{1F940}', '\u{1F945}'),
    ('\u{1F947}', '\u{1F94B}'),
    ('\u{1F94C}', '\u{1F94C}'),
    ('\u{1F950}', '\u{1F95E}'),
    ('\u{1F95F}', '\u{1F96B}'),
    ('\u{1F980}', '\u{1F984}'),
    ('\u{1F985}', '\u{1F991}'),
    ('\u{1F992}', '\u{1F997}'),
    ('\u{1F9C0}', '\u{1F9C0}'),
    ('\u{1F9D0}', '\u{1F9E6}'),
];
