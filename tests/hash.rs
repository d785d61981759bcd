//! Hash engine vectors: FIPS 180-4 SHA-256 and RFC 4231 HMAC-SHA-256

use cryptomem::{Nv, Sha256, DIGEST_LEN};

fn unhex(s: &str) -> Vec<u8> {
    s.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut ctx = Sha256::new();
    let mut digest = [0u8; DIGEST_LEN];
    ctx.update(data);
    ctx.finalize(&mut digest);
    digest
}

fn hmac(key: &[u8], data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut ctx = Sha256::new();
    let mut tag = [0u8; DIGEST_LEN];
    ctx.hmac_init(key);
    ctx.update(data);
    ctx.hmac_finalize(&mut tag);
    tag
}

#[test]
fn sha256_empty() {
    assert_eq!(
        sha256(b"").to_vec(),
        unhex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
}

#[test]
fn sha256_abc() {
    assert_eq!(
        sha256(b"abc").to_vec(),
        unhex("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
}

#[test]
fn sha256_two_blocks() {
    // 448-bit message; the length field spills into an extra block.
    assert_eq!(
        sha256(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq").to_vec(),
        unhex("248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1")
    );
}

#[test]
fn sha256_million_a() {
    let mut ctx = Sha256::new();
    let mut digest = [0u8; DIGEST_LEN];
    for _ in 0..1_000_000 {
        ctx.update(b"a");
    }
    ctx.finalize(&mut digest);
    assert_eq!(
        digest.to_vec(),
        unhex("cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0")
    );
}

#[test]
fn sha256_streaming_matches_one_shot() {
    let data: Vec<u8> = (0u32..1000).map(|i| (i * 7 % 251) as u8).collect();

    let mut ctx = Sha256::new();
    let mut digest = [0u8; DIGEST_LEN];
    for chunk in data.chunks(13) {
        ctx.update(chunk);
    }
    ctx.finalize(&mut digest);

    assert_eq!(digest, sha256(&data));
}

#[test]
fn sha256_context_reuse() {
    // finalize re-initialises the context for the next message.
    let mut ctx = Sha256::new();
    let mut first = [0u8; DIGEST_LEN];
    let mut second = [0u8; DIGEST_LEN];

    ctx.update(b"abc");
    ctx.finalize(&mut first);
    ctx.update(b"abc");
    ctx.finalize(&mut second);

    assert_eq!(first, second);
}

#[test]
fn factory_root_key_is_hash_of_zeros() {
    // The factory NV image uses SHA-256 of 32 zero bytes for the root key
    // and the user write password hash.
    let digest = sha256(&[0u8; 32]);
    let nv = Nv::factory();
    assert_eq!(digest, nv.root_key());
    assert_eq!(digest, nv.user_auth());
}

#[test]
fn hmac_rfc4231_case_1() {
    assert_eq!(
        hmac(&[0x0b; 20], b"Hi There").to_vec(),
        unhex("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
    );
}

#[test]
fn hmac_rfc4231_case_2() {
    assert_eq!(
        hmac(b"Jefe", b"what do ya want for nothing?").to_vec(),
        unhex("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
    );
}

#[test]
fn hmac_rfc4231_case_3() {
    assert_eq!(
        hmac(&[0xaa; 20], &[0xdd; 50]).to_vec(),
        unhex("773ea91e36800e46854db8ebd09181a72959098b3ef8c122d9635514ced565fe")
    );
}

#[test]
fn hmac_rfc4231_case_4() {
    let key: Vec<u8> = (1u8..=25).collect();
    assert_eq!(
        hmac(&key, &[0xcd; 50]).to_vec(),
        unhex("82558a389a443c0ea4cc819899f2083a85f0faa3e578f8077a2e3ff46729665b")
    );
}

#[test]
fn hmac_rfc4231_case_6_long_key() {
    // Key longer than the block size is hashed first.
    assert_eq!(
        hmac(
            &[0xaa; 131],
            b"Test Using Larger Than Block-Size Key - Hash Key First"
        )
        .to_vec(),
        unhex("60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54")
    );
}

#[test]
fn hmac_rfc4231_case_7_long_key_long_data() {
    let data: &[u8] = b"This is a test using a larger than block-size key and a larger \
than block-size data. The key needs to be hashed before being used by the HMAC \
algorithm.";
    assert_eq!(
        hmac(&[0xaa; 131], data).to_vec(),
        unhex("9b09ffa71b942fcb27635fbcd5b0e944bfdc63644f0713938a7f51535c3a35e2")
    );
}

#[test]
fn hmac_context_reuse() {
    // hmac_finalize leaves the context ready for an unrelated hash.
    let mut ctx = Sha256::new();
    let mut tag = [0u8; DIGEST_LEN];
    ctx.hmac_init(b"key");
    ctx.update(b"message");
    ctx.hmac_finalize(&mut tag);

    let mut digest = [0u8; DIGEST_LEN];
    ctx.update(b"abc");
    ctx.finalize(&mut digest);
    assert_eq!(digest, sha256(b"abc"));
}

#[test]
fn extend_is_append_and_rehash() {
    // Extend(Extend(P, A), B) == SHA256(SHA256(P || A) || B)
    let p = [0u8; 32];
    let a = b"first extension";
    let b = b"second extension";

    let mut ctx = Sha256::new();
    let mut pcr = [0u8; DIGEST_LEN];

    ctx.update(&p);
    ctx.update(a);
    ctx.finalize(&mut pcr);

    let intermediate = pcr;
    ctx.update(&pcr);
    ctx.update(b);
    ctx.finalize(&mut pcr);

    let expected_inner = sha256(&[&p[..], a].concat());
    assert_eq!(expected_inner, intermediate);
    let expected = sha256(&[&expected_inner[..], b].concat());
    assert_eq!(expected, pcr);
}
