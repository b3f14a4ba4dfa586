//! Provides a pure Rust implementation of the secp256k1 elliptic curve
//! arithmetic that backs key generation and the manual ECDSA scheme in
//! `crypto`.
//!
//! The equation is `y^2 = x^3 + a x + b` with `a = 0` and `b = 7`,
//! the modulo is `2^256 - 2^32 - 977`
//! (or `0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F`),
//! the generator is
//! `(0x79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798,
//!   0x483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8)`
//! and the order of the generator is
//! `0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141`
//! (cofactor `1`).
//!
//! Public operations work on affine points. Scalar multiplication runs in
//! Jacobian coordinates internally and converts back with a single inversion.
//!
//! Reference: <https://en.bitcoin.it/wiki/Secp256k1>

use finitelib::prelude::*;
use finitelib::gf::prime::Prime;

use crate::utils::*;


/// Point on the curve: either the point at infinity (identity of the group)
/// or an affine pair of coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Point {
    Infinity,
    Affine { x: U512, y: U512 },
}


impl Point {
    /// Create an affine point. The coordinates are not checked.
    pub fn affine(x: U512, y: U512) -> Self {
        Self::Affine { x, y }
    }

    /// Check if the point is the identity.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Self::Infinity)
    }

    /// X coordinate, `None` for the identity.
    pub fn x(&self) -> Option<&U512> {
        match self {
            Self::Infinity => None,
            Self::Affine { x, .. } => Some(x),
        }
    }

    /// Y coordinate, `None` for the identity.
    pub fn y(&self) -> Option<&U512> {
        match self {
            Self::Infinity => None,
            Self::Affine { y, .. } => Some(y),
        }
    }
}


/// Short Weierstrass curve defined by the equation `y^2 = x^3 + a x + b`.
pub struct WeierstrassCurve {
    /// The finite field that provides all the necessary arithmetic.
    pub field: Prime<U512, R512>,

    /// Modulo of the inner finite field.
    pub modulo: U512,

    /// Coefficient `a`.
    pub a: U512,

    /// Coefficient `b`.
    pub b: U512,

    /// Order of the generator.
    pub order: U512,

    /// Generator (or base point).
    pub generator: Point,

    /// `modulo - 2`, the Fermat exponent of the inversion.
    inv_exponent: U512,
}


/// Point in Jacobian coordinates `(X, Y, Z)` standing for `(X/Z^2, Y/Z^3)`.
/// `Z = 0` encodes the identity.
#[derive(Clone)]
struct Jacobian {
    x: U512,
    y: U512,
    z: U512,
}


impl WeierstrassCurve {
    /// Constructs a new instance of the curve using the standard parameters
    /// for secp256k1.
    pub fn new_secp256k1() -> Self {
        let modulo = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F"
        );
        let inv_exponent = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2D"
        );
        let field = Prime::new(R512{}, modulo.clone());
        let order = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"
        );
        let generator_x = u512_from_hex(
            "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798"
        );
        let generator_y = u512_from_hex(
            "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8"
        );

        Self {
            field,
            modulo,
            a: U512::from(0),
            b: U512::from(7),
            order,
            generator: Point::affine(generator_x, generator_y),
            inv_exponent,
        }
    }

    /// Modular inverse of `k` by Fermat's little theorem: `k^(p-2) mod p`.
    /// `k` must not be a multiple of the modulo.
    pub fn mod_inverse(&self, k: &U512) -> U512 {
        let k = k % &self.modulo;
        debug_assert!(k != U512::from(0), "inverse of zero is undefined");
        pow_mod(&self.field, &k, &self.inv_exponent)
    }

    /// Checks whether the point lies on the curve. The identity does.
    pub fn on_curve(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let left = self.field.mul(y, y);
                let right = self.field.add(
                    &self.field.add(
                        &self.field.mul(&self.field.mul(x, x), x),
                        &self.field.mul(&self.a, x),
                    ),
                    &self.b,
                );
                left == right
            },
        }
    }

    /// Checks that the coordinates are reduced and the point lies on the
    /// curve. Used for points coming from outside.
    pub fn is_valid_point(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                ((x % &self.modulo) == *x) &&
                ((y % &self.modulo) == *y) &&
                self.on_curve(point)
            },
        }
    }

    /// Negation of the point: `(x, -y)`.
    pub fn neg_point(&self, point: &Point) -> Point {
        match point {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::affine(x.clone(), self.field.neg(y)),
        }
    }

    /// Affine addition. Handles the identity, opposite points and doubling.
    pub fn add_points(&self, p: &Point, q: &Point) -> Point {
        let (x1, y1, x2, y2) = match (p, q) {
            (Point::Infinity, _) => return q.clone(),
            (_, Point::Infinity) => return p.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) =>
                (x1, y1, x2, y2),
        };

        if x1 == x2 {
            // P + (-P) = O
            if y1 != y2 {
                return Point::Infinity;
            }
            return self.double_point(p);
        }

        // Secant slope
        let lambda = self.field.mul(
            &self.field.sub(y2, y1),
            &self.mod_inverse(&self.field.sub(x2, x1)),
        );

        self.chord(x1, y1, x2, &lambda)
    }

    /// Affine doubling with the tangent slope. A point with `y = 0` doubles
    /// into the identity.
    pub fn double_point(&self, p: &Point) -> Point {
        match p {
            Point::Infinity => Point::Infinity,
            Point::Affine { y, .. } if *y == U512::from(0) => Point::Infinity,
            Point::Affine { x, y } => {
                let numerator = self.field.add(
                    &self.field.mul(&U512::from(3), &self.field.mul(x, x)),
                    &self.a,
                );
                let lambda = self.field.mul(
                    &numerator,
                    &self.mod_inverse(&self.field.add(y, y)),
                );
                self.chord(x, y, x, &lambda)
            },
        }
    }

    /// Multiply point `p` by scalar `k` with double-and-add starting from the
    /// low bit of `k`. `k = 0` yields the identity.
    pub fn scalar_multiply(&self, k: &U512, p: &Point) -> Point {
        let mut result = Jacobian::infinity();
        let mut addend = self.to_jacobian(p);

        for ix in 0..k.bit_len() {
            if k.bit_get(ix) {
                result = self.jacobian_add(&result, &addend);
            }
            addend = self.jacobian_double(&addend);
        }

        self.from_jacobian(&result)
    }

    /// Multiply the generator by `k`. Typically `k` is a private key and the
    /// result point is the corresponding public key.
    pub fn power(&self, k: &U512) -> Point {
        self.scalar_multiply(k, &self.generator)
    }

    fn chord(&self, x1: &U512, y1: &U512, x2: &U512, lambda: &U512) -> Point {
        let x3 = self.field.sub(
            &self.field.sub(&self.field.mul(lambda, lambda), x1),
            x2,
        );
        let y3 = self.field.sub(
            &self.field.mul(lambda, &self.field.sub(x1, &x3)),
            y1,
        );
        Point::affine(x3, y3)
    }

    fn to_jacobian(&self, p: &Point) -> Jacobian {
        match p {
            Point::Infinity => Jacobian::infinity(),
            Point::Affine { x, y } => Jacobian {
                x: x.clone(),
                y: y.clone(),
                z: self.field.one(),
            },
        }
    }

    fn from_jacobian(&self, p: &Jacobian) -> Point {
        if p.is_infinity() {
            return Point::Infinity;
        }
        let iz = self.mod_inverse(&p.z);
        let iz2 = self.field.mul(&iz, &iz);
        let x = self.field.mul(&p.x, &iz2);
        let y = self.field.mul(&p.y, &self.field.mul(&iz2, &iz));
        Point::affine(x, y)
    }

    fn jacobian_double(&self, p: &Jacobian) -> Jacobian {
        if p.is_infinity() || p.y == U512::from(0) {
            return Jacobian::infinity();
        }

        let f = &self.field;
        let y2 = f.mul(&p.y, &p.y);
        let s = f.mul(&U512::from(4), &f.mul(&p.x, &y2));
        let z2 = f.mul(&p.z, &p.z);
        let m = f.add(
            &f.mul(&U512::from(3), &f.mul(&p.x, &p.x)),
            &f.mul(&self.a, &f.mul(&z2, &z2)),
        );
        let x = f.sub(&f.mul(&m, &m), &f.add(&s, &s));
        let y = f.sub(
            &f.mul(&m, &f.sub(&s, &x)),
            &f.mul(&U512::from(8), &f.mul(&y2, &y2)),
        );
        let z = f.mul(&f.add(&p.y, &p.y), &p.z);
        Jacobian { x, y, z }
    }

    fn jacobian_add(&self, p: &Jacobian, q: &Jacobian) -> Jacobian {
        if p.is_infinity() {
            return q.clone();
        }
        if q.is_infinity() {
            return p.clone();
        }

        let f = &self.field;
        let pz2 = f.mul(&p.z, &p.z);
        let qz2 = f.mul(&q.z, &q.z);
        let u1 = f.mul(&p.x, &qz2);
        let u2 = f.mul(&q.x, &pz2);
        let s1 = f.mul(&p.y, &f.mul(&qz2, &q.z));
        let s2 = f.mul(&q.y, &f.mul(&pz2, &p.z));

        if u1 == u2 {
            if s1 != s2 {
                return Jacobian::infinity();
            }
            return self.jacobian_double(p);
        }

        let h = f.sub(&u2, &u1);
        let r = f.sub(&s2, &s1);
        let h2 = f.mul(&h, &h);
        let h3 = f.mul(&h, &h2);
        let u1h2 = f.mul(&u1, &h2);

        let x = f.sub(
            &f.sub(&f.mul(&r, &r), &h3),
            &f.add(&u1h2, &u1h2),
        );
        let y = f.sub(
            &f.mul(&r, &f.sub(&u1h2, &x)),
            &f.mul(&s1, &h3),
        );
        let z = f.mul(&h, &f.mul(&p.z, &q.z));
        Jacobian { x, y, z }
    }
}


impl Jacobian {
    fn infinity() -> Self {
        Self {
            x: U512::from(1),
            y: U512::from(1),
            z: U512::from(0),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z == U512::from(0)
    }
}


/// `base^exponent` in the prime field by square-and-multiply over the bits of
/// the exponent, starting from the low bit.
pub fn pow_mod(field: &Prime<U512, R512>, base: &U512, exponent: &U512) -> U512 {
    let mut result = field.one();
    let mut square = base.clone();
    for ix in 0..exponent.bit_len() {
        if exponent.bit_get(ix) {
            result = field.mul(&result, &square);
        }
        square = field.mul(&square, &square);
    }
    result
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn multiple(curve: &WeierstrassCurve, k: u64) -> Point {
        curve.power(&U512::from(k))
    }

    #[test]
    fn test_secp256k1() {
        // Create a curve instance
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        assert!(secp256k1.on_curve(&secp256k1.generator));

        // Check for random power
        let mut rng = rand::rng();
        let bytes: [u8; 32] = rng.random();
        let k = &u512_from_be_bytes(&bytes) % &secp256k1.order;
        let p = secp256k1.power(&k);
        assert!(secp256k1.on_curve(&p));
        assert!(secp256k1.is_valid_point(&p));

        // Check the order
        let e = secp256k1.power(&secp256k1.order);
        assert_eq!(e, Point::Infinity);
    }

    #[test]
    fn test_known_multiples() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();

        let g2 = Point::affine(
            u512_from_hex(
                "C6047F9441ED7D6D3045406E95C07CD85C778E4B8CEF3CA7ABAC09B95C709EE5"
            ),
            u512_from_hex(
                "1AE168FEA63DC339A3C58419466CEAEEF7F632653266D0E1236431A950CFE52A"
            ),
        );
        let g3 = Point::affine(
            u512_from_hex(
                "F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9"
            ),
            u512_from_hex(
                "388F7B0F632DE8140FE337E62A37F3566500A99934C2231B6CB9FD7584B8E672"
            ),
        );

        assert_eq!(secp256k1.double_point(&secp256k1.generator), g2);
        assert_eq!(secp256k1.add_points(&secp256k1.generator, &g2), g3);
        assert_eq!(multiple(&secp256k1, 2), g2);
        assert_eq!(multiple(&secp256k1, 3), g3);
    }

    #[test]
    fn test_scalar_multiply_matches_affine() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        let g = &secp256k1.generator;

        let mut acc = Point::Infinity;
        for k in 1..=7 {
            acc = secp256k1.add_points(&acc, g);
            assert_eq!(multiple(&secp256k1, k), acc);
        }

        let p3 = multiple(&secp256k1, 3);
        let p4 = multiple(&secp256k1, 4);
        assert_eq!(secp256k1.add_points(&p3, &p4), multiple(&secp256k1, 7));
        assert_eq!(secp256k1.scalar_multiply(&U512::from(5), &p3),
                   multiple(&secp256k1, 15));
    }

    #[test]
    fn test_identity() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        let p = multiple(&secp256k1, 11);

        assert_eq!(secp256k1.add_points(&p, &Point::Infinity), p);
        assert_eq!(secp256k1.add_points(&Point::Infinity, &p), p);
        assert_eq!(
            secp256k1.add_points(&Point::Infinity, &Point::Infinity),
            Point::Infinity
        );

        let minus_p = secp256k1.neg_point(&p);
        assert!(secp256k1.on_curve(&minus_p));
        assert_eq!(secp256k1.add_points(&p, &minus_p), Point::Infinity);

        assert_eq!(secp256k1.power(&U512::from(0)), Point::Infinity);
        assert_eq!(secp256k1.power(&U512::from(1)), secp256k1.generator);
        assert_eq!(secp256k1.double_point(&Point::Infinity), Point::Infinity);
    }

    #[test]
    fn test_order_minus_one_is_negation() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        let order_minus_one = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364140"
        );
        assert_eq!(secp256k1.power(&order_minus_one),
                   secp256k1.neg_point(&secp256k1.generator));
    }

    #[test]
    fn test_mod_inverse() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        for k in [1u64, 2, 3, 977, 123456789] {
            let k = U512::from(k);
            let inv = secp256k1.mod_inverse(&k);
            assert_eq!(secp256k1.field.mul(&k, &inv), secp256k1.field.one());
        }

        // Inputs above the modulo are reduced first
        let k = u512_from_hex(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC31"
        );
        assert_eq!(secp256k1.mod_inverse(&k),
                   secp256k1.mod_inverse(&U512::from(2)));
    }

    #[test]
    fn test_is_valid_point() {
        let secp256k1 = WeierstrassCurve::new_secp256k1();
        let off_curve = Point::affine(U512::from(1), U512::from(1));
        assert!(!secp256k1.on_curve(&off_curve));
        assert!(!secp256k1.is_valid_point(&off_curve));

        // Generator with `p` added to y is the same point but not reduced
        let g = secp256k1.generator.clone();
        let unreduced = Point::affine(
            g.x().unwrap().clone(),
            u512_from_hex(
                "1483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08EFB10D0E7"
            ),
        );
        assert!(!secp256k1.is_valid_point(&unreduced));
        assert!(secp256k1.is_valid_point(&g));
    }
}
