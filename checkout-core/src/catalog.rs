//! Static plan catalog

use crate::types::Plan;
use rust_decimal::Decimal;

static PLANS: [Plan; 3] = [
    Plan {
        id: "start",
        name: "Start",
        monthly_price: Decimal::from_parts(49, 0, 0, false, 0),
        features: &[
            "500 créditos mensais",
            "Geração de Imagens",
            "Chat Ilimitado",
            "Suporte Básico",
        ],
        featured: false,
    },
    Plan {
        id: "creator",
        name: "Creator",
        monthly_price: Decimal::from_parts(97, 0, 0, false, 0),
        features: &[
            "2.500 créditos mensais",
            "Vídeos em HD",
            "Avatares Personalizados",
            "Clonagem de Voz",
            "Suporte Prioritário",
        ],
        featured: true,
    },
    Plan {
        id: "premium",
        name: "Premium",
        monthly_price: Decimal::from_parts(197, 0, 0, false, 0),
        features: &[
            "10.000 créditos mensais",
            "Acesso via API",
            "Múltiplos Usuários",
            "Consultoria de IA",
            "Gerente de Conta",
        ],
        featured: false,
    },
];

/// All plans, in display order
pub fn plans() -> &'static [Plan] {
    &PLANS
}

/// Look up a plan by id
pub fn find(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contents() {
        let ids: Vec<&str> = plans().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["start", "creator", "premium"]);

        let featured: Vec<&str> = plans().iter().filter(|p| p.featured).map(|p| p.id).collect();
        assert_eq!(featured, vec!["creator"]);
    }

    #[test]
    fn test_find_plan() {
        let creator = find("creator").unwrap();
        assert_eq!(creator.name, "Creator");
        assert_eq!(creator.monthly_price, Decimal::new(97, 0));
        assert_eq!(creator.features.len(), 5);

        assert!(find("enterprise").is_none());
    }
}
