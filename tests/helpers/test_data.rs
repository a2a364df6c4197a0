//! Staff fixtures shared by the scenario tests

use SecretaryBot::models::Professional;

use super::OWNER_ID;

pub fn joana() -> Professional {
    Professional::new(OWNER_ID, "Joana", &["corte", "escova"])
}

pub fn bruna() -> Professional {
    Professional::new(OWNER_ID, "Bruna", &["corte", "escova", "hidratação"])
        .with_duration("escova", 40)
        .with_duration("hidratação", 45)
}

pub fn carla() -> Professional {
    Professional::new(OWNER_ID, "Carla", &["hidratação", "manicure"])
        .with_duration("hidratação", 45)
        .with_duration("manicure", 30)
}
