use rand::{Rng, CryptoRng};
use serde::{Serialize, Deserialize};
use finitelib::prelude::*;
use finitelib::gf::prime::Prime;

use crate::validate;
use crate::utils::*;
use crate::error::{Error, ErrorKind};
use crate::hash::sha256_u512;
use crate::curve::{WeierstrassCurve, Point, pow_mod};


/// Public key: affine point `Q = d G`. It is never the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    pub x: U512,
    pub y: U512,
}


/// ECDSA signature `(r, s)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub r: U512,
    pub s: U512,
}


/// Key pair of an identity. The private scalar is kept in memory only and is
/// redacted in `Debug` output.
#[derive(Clone)]
pub struct KeyPair {
    private: U512,
    public: PublicKey,
}


/// Decimal-string form of a key pair for transport-agnostic interchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPairInterchange {
    pub private_key: String,
    pub public_key: [String; 2],
}


/// Crypto schema object that is responsible for operations over keys and
/// signatures on secp256k1. It includes the ECDSA algorithms.
pub struct Schema {
    curve: WeierstrassCurve,
    field: Prime<U512, R512>,
    inv_exponent: U512,
}


impl PublicKey {
    /// Convert into a curve point.
    pub fn point(&self) -> Point {
        Point::affine(self.x.clone(), self.y.clone())
    }

    /// Take the coordinates of an affine point, `None` for the identity.
    pub fn from_point(point: &Point) -> Option<Self> {
        match point {
            Point::Infinity => None,
            Point::Affine { x, y } => Some(Self { x: x.clone(), y: y.clone() }),
        }
    }

    /// Coordinates as decimal strings `[x, y]`.
    pub fn to_strings(&self) -> [String; 2] {
        [u512_to_decimal(&self.x), u512_to_decimal(&self.y)]
    }

    /// Parse decimal coordinates and check that the point is on the curve.
    pub fn from_strings(schema: &Schema, coords: &[String; 2]) ->
                        Result<Self> {
        let x = u512_from_decimal(&coords[0])
            .ok_or_else(|| Error::payload("public_key[0]",
                                          "expected a decimal integer"))?;
        let y = u512_from_decimal(&coords[1])
            .ok_or_else(|| Error::payload("public_key[1]",
                                          "expected a decimal integer"))?;
        let public = Self { x, y };
        validate!(schema.curve.is_valid_point(&public.point()), PointNotOnCurve,
                  "public key is not a point of secp256k1")?;
        Ok(public)
    }
}


impl Signature {
    /// Components as decimal strings `[r, s]`.
    pub fn to_strings(&self) -> [String; 2] {
        [u512_to_decimal(&self.r), u512_to_decimal(&self.s)]
    }

    /// Parse decimal components. Ranges are not checked here: verification
    /// rejects out-of-range values.
    pub fn from_strings(values: &[String; 2]) -> Result<Self> {
        let r = u512_from_decimal(&values[0])
            .ok_or_else(|| Error::payload("signature[0]",
                                          "expected a decimal integer"))?;
        let s = u512_from_decimal(&values[1])
            .ok_or_else(|| Error::payload("signature[1]",
                                          "expected a decimal integer"))?;
        Ok(Self { r, s })
    }
}


impl KeyPair {
    /// Private scalar.
    pub fn private_key(&self) -> &U512 {
        &self.private
    }

    /// Public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Decimal-string form.
    pub fn to_interchange(&self) -> KeyPairInterchange {
        KeyPairInterchange {
            private_key: u512_to_decimal(&self.private),
            public_key: self.public.to_strings(),
        }
    }

    /// Restore a key pair from the decimal-string form. The public key must
    /// correspond to the private one.
    pub fn from_interchange(schema: &Schema,
                            interchange: &KeyPairInterchange) -> Result<Self> {
        let private = u512_from_decimal(&interchange.private_key)
            .ok_or_else(|| Error::payload("private_key",
                                          "expected a decimal integer"))?;
        let public = PublicKey::from_strings(schema, &interchange.public_key)?;
        validate!(schema.check_pair(&private, &public), PointNotOnCurve,
                  "public key does not match the private key")?;
        Ok(Self { private, public })
    }
}


impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}


impl Schema {
    /// Create a new schema object.
    pub fn new() -> Self {
        let curve = WeierstrassCurve::new_secp256k1();
        let field = Prime::new(R512{}, curve.order.clone());
        let inv_exponent = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD036413F"
        );
        Self { curve, field, inv_exponent }
    }

    /// Underlying curve.
    pub fn curve(&self) -> &WeierstrassCurve {
        &self.curve
    }

    /// Order `n` of the generator.
    pub fn order(&self) -> &U512 {
        &self.curve.order
    }

    /// Generate a random scalar in `[1, n - 1]`. 256-bit candidates are
    /// rejected until one falls into the range.
    pub fn gen_key<R: Rng + CryptoRng>(&self, rng: &mut R) -> U512 {
        loop {
            let bytes: [u8; 32] = rng.random();
            let key = u512_from_be_bytes(&bytes);
            if in_scalar_range(&key, &self.curve.order) {
                return key;
            }
        }
    }

    /// Get public key from a private one.
    pub fn get_public(&self, key: &U512) -> Result<PublicKey> {
        validate!(in_scalar_range(key, &self.curve.order), ScalarOutOfRange,
                  "private key must be in [1, n - 1]")?;
        PublicKey::from_point(&self.curve.power(key))
            .ok_or_else(|| ErrorKind::PointNotOnCurve.into())
    }

    /// Generate a key pair.
    pub fn gen_pair<R: Rng + CryptoRng>(&self, rng: &mut R) -> KeyPair {
        loop {
            let private = self.gen_key(rng);
            // `gen_key` keeps the scalar in range, so this always succeeds
            if let Ok(public) = self.get_public(&private) {
                return KeyPair { private, public };
            }
        }
    }

    /// Check the key pair.
    pub fn check_pair(&self, key: &U512, public: &PublicKey) -> bool {
        match self.get_public(key) {
            Ok(expected) => expected == *public,
            Err(_) => false,
        }
    }

    /// Build ECDSA signature of `msg` with a fresh ephemeral scalar for every
    /// call. Zero `r` or `s` causes a silent retry.
    pub fn build_signature<R: Rng + CryptoRng>(&self, rng: &mut R, msg: &[u8],
                                               key: &U512) -> Result<Signature> {
        validate!(in_scalar_range(key, &self.curve.order), ScalarOutOfRange,
                  "private key must be in [1, n - 1]")?;

        let h = self.msg_scalar(msg);
        let zero = U512::from(0);

        loop {
            // Ephemeral point
            let k = self.gen_key(rng);
            let r = match self.curve.power(&k) {
                Point::Affine { x, .. } => &x % &self.curve.order,
                Point::Infinity => continue,
            };
            if r == zero {
                continue;
            }

            // s = k^-1 (h + d r) mod n
            let s = self.field.mul(
                &self.scalar_inverse(&k),
                &self.field.add(&h, &self.field.mul(key, &r)),
            );
            if s == zero {
                continue;
            }

            return Ok(Signature { r, s });
        }
    }

    /// Check ECDSA signature. Any malformed input (components out of
    /// `[1, n - 1]`, public key off the curve) gives `false`.
    pub fn check_signature(&self, msg: &[u8], public: &PublicKey,
                           signature: &Signature) -> bool {
        let Signature { r, s } = signature;
        if !in_scalar_range(r, &self.curve.order) ||
           !in_scalar_range(s, &self.curve.order) {
            return false;
        }

        let q = public.point();
        if !self.curve.is_valid_point(&q) {
            return false;
        }

        let h = self.msg_scalar(msg);
        let s_inv = self.scalar_inverse(s);
        let u1 = self.field.mul(&h, &s_inv);
        let u2 = self.field.mul(r, &s_inv);

        let p = self.curve.add_points(
            &self.curve.power(&u1),
            &self.curve.scalar_multiply(&u2, &q),
        );

        match p {
            Point::Infinity => false,
            Point::Affine { x, .. } => (&x % &self.curve.order) == *r,
        }
    }

    /// Message digest as a scalar: SHA-256 read big-endian, reduced mod `n`.
    fn msg_scalar(&self, msg: &[u8]) -> U512 {
        &sha256_u512(msg) % &self.curve.order
    }

    /// Inverse modulo `n` by Fermat's little theorem.
    fn scalar_inverse(&self, k: &U512) -> U512 {
        pow_mod(&self.field, k, &self.inv_exponent)
    }
}


impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
