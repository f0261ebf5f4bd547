use nom::{
    IResult, Parser,
    bytes::complete::{take_while, take_while1},
    character::complete::satisfy,
    combinator::{recognize, verify},
    multi::many0,
    sequence::pair,
};

// 2.3.1 Message format in Augmented BNF
//
//    The protocol messages must be extracted from the contiguous stream of
//    octets.  The current solution is to designate two characters, CR and
//    LF, as message separators.  Empty messages are silently ignored,
//    which permits use of the sequence CR-LF between messages without
//    extra problems.
//
//     nospcrlfcl =  %x01-09 / %x0B-0C / %x0E-1F / %x21-39 / %x3B-FF
//                     ; any octet except NUL, CR, LF, " " and ":"
//     middle     =  nospcrlfcl *( ":" / nospcrlfcl )
//     trailing   =  *( ":" / " " / nospcrlfcl )
//     SPACE      =  %x20        ; space character

fn is_nospcrlfcl(c: char) -> bool {
    !matches!(c, '\0' | '\r' | '\n' | ' ' | ':')
}

// SPACE = %x20 (runs tolerated, as the reference tokenizer skips empties)
pub fn sp(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == ' ').parse(input)
}

// middle = nospcrlfcl *( ":" / nospcrlfcl )
pub fn middle_parser(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(is_nospcrlfcl),
        many0(satisfy(|c| c == ':' || is_nospcrlfcl(c))),
    ))
    .parse(input)
}

// trailing = *( ":" / " " / nospcrlfcl )
pub fn trailing_parser(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ':' || c == ' ' || is_nospcrlfcl(c)).parse(input)
}

// nickname   =  letter *8( letter / digit / special / "-" / "_" )
// special    =  "[", "]", "\", "`", "_", "^", "{", "|", "}"
//
// The first character is restricted to an ASCII letter; overall length is
// capped at nine bytes.
fn is_nickname_tail_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_[]\\`^{|}".contains(c)
}

pub fn nickname_parser(input: &str) -> IResult<&str, &str> {
    let parser = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic()),
        take_while(is_nickname_tail_char),
    ));
    verify(parser, |s: &str| s.len() <= 9).parse(input)
}

// channel    =  ( "#" / "&" ) chanstring
// chanstring =  letter / digit / special / "-" / "_"
//                 ; no spaces, commas, colons or control bytes
//
// Total length is capped at fifty bytes including the sigil.
pub fn channel_parser(input: &str) -> IResult<&str, &str> {
    let parser = recognize(pair(
        satisfy(|c| c == '#' || c == '&'),
        take_while(is_nickname_tail_char),
    ));
    verify(parser, |s: &str| s.len() <= 50).parse(input)
}

// key = 1*23( %x01-05 / %x07-08 / %x0C / %x0E-1F / %x21-7F )
//         ; any 7-bit US_ASCII character,
//         ; except NUL, CR, LF, FF, h/v TABs, and " "
fn is_key_char(c: char) -> bool {
    if !c.is_ascii() {
        return false;
    }
    matches!(c as u8,
        0x01..=0x05 |
        0x07..=0x08 |
        0x0C |
        0x0E..=0x1F |
        0x21..=0x7F
    )
}

pub fn key_parser(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_key_char), |s: &str| s.len() <= 23).parse(input)
}

/// True when the whole input is one well-formed nickname.
pub fn is_valid_nickname(input: &str) -> bool {
    matches!(nickname_parser(input), Ok(("", _)))
}

/// True when the whole input is one well-formed channel name.
pub fn is_valid_channel_name(input: &str) -> bool {
    matches!(channel_parser(input), Ok(("", parsed)) if parsed.len() > 1)
}

/// True when the whole input is acceptable as a channel key.
pub fn is_valid_key(input: &str) -> bool {
    matches!(key_parser(input), Ok(("", _)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_nicknames() {
        let cases = ["a", "a1", "abc123", "Z9", "x-y", "t[est]", "g{ood}", "h\\i", "j`k", "m^n", "under_a"];
        for &case in &cases {
            let (rest, out) = nickname_parser(case).unwrap_or_else(|_| panic!("should parse: {case}"));
            assert_eq!(rest, "");
            assert_eq!(out, case);
        }
    }

    #[test]
    fn invalid_nicknames() {
        assert!(!is_valid_nickname(""));
        assert!(!is_valid_nickname("1abc"), "cannot start with digit");
        assert!(!is_valid_nickname("[abc"), "cannot start with special");
        assert!(!is_valid_nickname("-abc"), "cannot start with dash");
        assert!(!is_valid_nickname("has space"));
    }

    #[test]
    fn nickname_length_boundary() {
        assert!(is_valid_nickname("abcdefghi"), "nine bytes accepted");
        assert!(!is_valid_nickname("abcdefghij"), "ten bytes rejected");
    }

    #[test]
    fn valid_channel_names() {
        for &case in &["#chat", "&local", "#a", "#rust-beginners", "#c{1}_x"] {
            assert!(is_valid_channel_name(case), "should accept {case}");
        }
    }

    #[test]
    fn invalid_channel_names() {
        assert!(!is_valid_channel_name("chat"), "missing sigil");
        assert!(!is_valid_channel_name("#"), "sigil alone");
        assert!(!is_valid_channel_name("#has space"));
        assert!(!is_valid_channel_name("#a,b"));
        assert!(!is_valid_channel_name("#a\x07b"), "control byte");
    }

    #[test]
    fn channel_length_boundary() {
        let fifty = format!("#{}", "c".repeat(49));
        let fifty_one = format!("#{}", "c".repeat(50));
        assert_eq!(fifty.len(), 50);
        assert!(is_valid_channel_name(&fifty));
        assert!(!is_valid_channel_name(&fifty_one));
    }

    #[test]
    fn keys() {
        assert!(is_valid_key("sekrit"));
        assert!(is_valid_key("s3kr1t!"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("with space"));
        assert!(!is_valid_key(&"k".repeat(24)), "24 bytes rejected");
    }

    #[test]
    fn middle_stops_at_space() {
        let (rest, out) = middle_parser("abc def").unwrap();
        assert_eq!(out, "abc");
        assert_eq!(rest, " def");
    }

    #[test]
    fn middle_allows_inner_colon_but_not_leading() {
        let (rest, out) = middle_parser("a:b").unwrap();
        assert_eq!(out, "a:b");
        assert_eq!(rest, "");
        assert!(middle_parser(":ab").is_err());
    }

    #[test]
    fn trailing_takes_everything_printable() {
        let (rest, out) = trailing_parser("hello world :-)").unwrap();
        assert_eq!(out, "hello world :-)");
        assert_eq!(rest, "");
    }
}
